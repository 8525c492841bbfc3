//! Report generation business logic.
//!
//! Builds a per-company overview of budgets, team ledgers and replication activity. The
//! report is plain data; [`format_company_overview`] renders it as text for logs and
//! terminals.

use crate::{
    core::{
        budget::{BudgetStatus, get_budgets_for_company},
        ledger::{get_pending_requests, get_team_budgets_for_company},
        replication::get_latest_replication_log,
    },
    entities::replication_log,
    errors::Result,
};
use sea_orm::DatabaseConnection;
use std::fmt::Write;

/// Ledger state of one team.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamSummary {
    pub team_id: String,
    pub team_name: String,
    pub available_amount: f64,
    pub pending_requests: usize,
    pub pending_amount: f64,
}

/// Aggregated view of one company.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyOverview {
    pub company_id: String,
    /// Number of budgets in each status, in lifecycle order
    pub budgets_by_status: Vec<(BudgetStatus, usize)>,
    /// Cash of approved, released and replicated budgets
    pub committed_cash: f64,
    /// Points of approved, released and replicated budgets
    pub committed_points: i64,
    pub teams: Vec<TeamSummary>,
    pub latest_replication: Option<replication_log::Model>,
}

impl CompanyOverview {
    /// Number of budgets currently in `status`.
    #[must_use]
    pub fn count(&self, status: BudgetStatus) -> usize {
        self.budgets_by_status
            .iter()
            .find(|(s, _)| *s == status)
            .map_or(0, |(_, n)| *n)
    }

    /// Budgets waiting on an administrator (`submitted` or `reviewed`).
    #[must_use]
    pub fn awaiting_decision(&self) -> usize {
        self.count(BudgetStatus::Submitted) + self.count(BudgetStatus::Reviewed)
    }
}

/// Generates the overview for a company.
pub async fn generate_company_overview(
    db: &DatabaseConnection,
    company_id: &str,
) -> Result<CompanyOverview> {
    let budgets = get_budgets_for_company(db, company_id).await?;

    let mut budgets_by_status: Vec<(BudgetStatus, usize)> =
        BudgetStatus::ALL.iter().map(|s| (*s, 0)).collect();
    let mut committed_cash = 0.0;
    let mut committed_points = 0;
    for budget in &budgets {
        let status = budget.status()?;
        if let Some((_, n)) = budgets_by_status.iter_mut().find(|(s, _)| *s == status) {
            *n += 1;
        }
        if status.is_committed() {
            committed_cash += budget.total_cash;
            committed_points += budget.total_points;
        }
    }

    let mut teams = Vec::new();
    for team in get_team_budgets_for_company(db, company_id).await? {
        let pending = get_pending_requests(db, team.id).await?;
        teams.push(TeamSummary {
            pending_requests: pending.len(),
            pending_amount: pending.iter().map(|r| r.amount).sum(),
            team_id: team.team_id,
            team_name: team.team_name,
            available_amount: team.available_amount,
        });
    }

    let latest_replication = get_latest_replication_log(db, company_id).await?;

    Ok(CompanyOverview {
        company_id: company_id.to_string(),
        budgets_by_status,
        committed_cash,
        committed_points,
        teams,
        latest_replication,
    })
}

/// Renders an overview as multi-line text.
#[must_use]
pub fn format_company_overview(overview: &CompanyOverview) -> String {
    let mut out = format!("Company {}\n", overview.company_id);

    let counts: Vec<String> = overview
        .budgets_by_status
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(s, n)| format!("{s}: {n}"))
        .collect();
    if counts.is_empty() {
        out.push_str("  Budgets: none\n");
    } else {
        let _ = writeln!(out, "  Budgets: {}", counts.join(", "));
    }
    let _ = writeln!(
        out,
        "  Committed: ${:.2} / {} pts",
        overview.committed_cash, overview.committed_points
    );

    for team in &overview.teams {
        let _ = writeln!(
            out,
            "  Team {} ({}): ${:.2} available, {} pending (${:.2})",
            team.team_name,
            team.team_id,
            team.available_amount,
            team.pending_requests,
            team.pending_amount
        );
    }

    match &overview.latest_replication {
        Some(log) => {
            let _ = writeln!(
                out,
                "  Last replication: {} ({}/{} written, {} failed)",
                log.status,
                i64::from(log.created) + i64::from(log.updated),
                log.total,
                log.failed
            );
        }
        None => out.push_str("  Last replication: never\n"),
    }

    out
}
