//! Team budget ledger - Funding requests and allocations against a team's available balance.
//!
//! Submitting a request never moves money. Approving one debits the team's
//! `available_amount` by exactly the requested amount; rejecting one leaves the balance alone.
//! Each request is resolved at most once, a second approve or reject fails with
//! [`Error::RequestAlreadyResolved`]. Allocations credit the balance and are kept as history.
//!
//! Balance changes are single `UPDATE ... SET available_amount = available_amount ± x`
//! statements executed in the same database transaction as the request update, so concurrent
//! callers cannot lose each other's writes.

use crate::{
    core::{
        approval_rule::{RuleDecision, evaluate_rules, get_active_approval_rules},
        condition::{Candidate, ConditionField},
    },
    entities::{Allocation, BudgetRequest, TeamBudget, allocation, budget_request, team_budget},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use std::{fmt, str::FromStr};
use tracing::{debug, info, instrument, warn};

/// Resolution state of a funding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(Error::validation(format!("Unknown request status: {other}"))),
        }
    }
}

impl budget_request::Model {
    /// Parses the stored status column.
    pub fn status(&self) -> Result<RequestStatus> {
        self.status.parse()
    }
}

/// A team budget together with its requests, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamBudgetView {
    pub team: team_budget::Model,
    pub requests: Vec<budget_request::Model>,
}

fn validate_positive(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

fn validate_text(value: &str, what: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{what} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

/// Opens a ledger for a team. `team_id` must be unused.
#[instrument(skip(db))]
pub async fn create_team_budget(
    db: &DatabaseConnection,
    company_id: &str,
    team_id: &str,
    team_name: &str,
    initial_amount: f64,
) -> Result<team_budget::Model> {
    let team_id = validate_text(team_id, "Team id")?;
    let team_name = validate_text(team_name, "Team name")?;
    let company_id = validate_text(company_id, "Company id")?;
    if !initial_amount.is_finite() || initial_amount < 0.0 {
        return Err(Error::InvalidAmount {
            amount: initial_amount,
        });
    }

    if get_team_budget_by_team_id(db, &team_id).await?.is_some() {
        return Err(Error::validation(format!(
            "Team budget for '{team_id}' already exists"
        )));
    }

    let model = team_budget::ActiveModel {
        company_id: Set(company_id),
        team_id: Set(team_id),
        team_name: Set(team_name),
        available_amount: Set(initial_amount),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let created = model.insert(db).await?;
    info!(team_budget_id = created.id, "Created team budget");
    Ok(created)
}

pub async fn get_team_budget(
    db: &DatabaseConnection,
    team_budget_id: i64,
) -> Result<Option<team_budget::Model>> {
    TeamBudget::find_by_id(team_budget_id)
        .one(db)
        .await
        .map_err(Into::into)
}

pub async fn get_team_budget_by_team_id(
    db: &DatabaseConnection,
    team_id: &str,
) -> Result<Option<team_budget::Model>> {
    TeamBudget::find()
        .filter(team_budget::Column::TeamId.eq(team_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// All team ledgers of a company, by team name.
pub async fn get_team_budgets_for_company(
    db: &DatabaseConnection,
    company_id: &str,
) -> Result<Vec<team_budget::Model>> {
    TeamBudget::find()
        .filter(team_budget::Column::CompanyId.eq(company_id))
        .order_by_asc(team_budget::Column::TeamName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads a team ledger by its external team id together with all of its requests.
pub async fn get_team_budget_with_requests(
    db: &DatabaseConnection,
    team_id: &str,
) -> Result<TeamBudgetView> {
    let team = get_team_budget_by_team_id(db, team_id)
        .await?
        .ok_or_else(|| Error::TeamBudgetNotFound {
            team: team_id.to_string(),
        })?;
    let requests = get_requests_for_team(db, team.id).await?;
    Ok(TeamBudgetView { team, requests })
}

/// Records a pending funding request. The team balance is not touched.
#[instrument(skip(db, reason))]
pub async fn submit_request(
    db: &DatabaseConnection,
    team_budget_id: i64,
    requested_by: &str,
    amount: f64,
    reason: &str,
) -> Result<budget_request::Model> {
    validate_positive(amount)?;
    let reason = validate_text(reason, "Request reason")?;
    let requested_by = validate_text(requested_by, "Requester")?;

    TeamBudget::find_by_id(team_budget_id)
        .one(db)
        .await?
        .ok_or(Error::TeamBudgetIdNotFound { id: team_budget_id })?;

    let model = budget_request::ActiveModel {
        team_budget_id: Set(team_budget_id),
        requested_by: Set(requested_by),
        amount: Set(amount),
        reason: Set(reason),
        status: Set(RequestStatus::Pending.to_string()),
        requested_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let created = model.insert(db).await?;
    info!(request_id = created.id, "Submitted budget request");
    Ok(created)
}

pub async fn get_request_by_id(
    db: &DatabaseConnection,
    request_id: i64,
) -> Result<Option<budget_request::Model>> {
    BudgetRequest::find_by_id(request_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Every request of a team, newest first.
pub async fn get_requests_for_team(
    db: &DatabaseConnection,
    team_budget_id: i64,
) -> Result<Vec<budget_request::Model>> {
    BudgetRequest::find()
        .filter(budget_request::Column::TeamBudgetId.eq(team_budget_id))
        .order_by_desc(budget_request::Column::RequestedAt)
        .order_by_desc(budget_request::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Pending requests of a team, oldest first.
pub async fn get_pending_requests(
    db: &DatabaseConnection,
    team_budget_id: i64,
) -> Result<Vec<budget_request::Model>> {
    BudgetRequest::find()
        .filter(budget_request::Column::TeamBudgetId.eq(team_budget_id))
        .filter(budget_request::Column::Status.eq(RequestStatus::Pending.as_str()))
        .order_by_asc(budget_request::Column::RequestedAt)
        .order_by_asc(budget_request::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Atomically subtracts `amount` from a team's balance. Fails without writing if the
/// balance is smaller than `amount`.
async fn debit_team_budget_atomic<C>(db: &C, team_budget_id: i64, amount: f64) -> Result<()>
where
    C: ConnectionTrait,
{
    let team = TeamBudget::find_by_id(team_budget_id)
        .one(db)
        .await?
        .ok_or(Error::TeamBudgetIdNotFound { id: team_budget_id })?;

    let result = TeamBudget::update_many()
        .col_expr(
            team_budget::Column::AvailableAmount,
            Expr::col(team_budget::Column::AvailableAmount).sub(amount),
        )
        .filter(team_budget::Column::Id.eq(team_budget_id))
        .filter(team_budget::Column::AvailableAmount.gte(amount))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::InsufficientFunds {
            available: team.available_amount,
            required: amount,
        });
    }
    Ok(())
}

/// Atomically adds `amount` to a team's balance.
async fn credit_team_budget_atomic<C>(db: &C, team_budget_id: i64, amount: f64) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = TeamBudget::update_many()
        .col_expr(
            team_budget::Column::AvailableAmount,
            Expr::col(team_budget::Column::AvailableAmount).add(amount),
        )
        .filter(team_budget::Column::Id.eq(team_budget_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::TeamBudgetIdNotFound { id: team_budget_id });
    }
    Ok(())
}

/// Who resolved a request and why.
struct Resolution {
    outcome: RequestStatus,
    reviewer: String,
    notes: Option<String>,
    rule_id: Option<i64>,
}

async fn resolve_request_on<C>(
    db: &C,
    request: budget_request::Model,
    resolution: Resolution,
) -> Result<budget_request::Model>
where
    C: ConnectionTrait,
{
    let current = request.status()?;
    if current != RequestStatus::Pending {
        warn!(request_id = request.id, %current, "Request already resolved");
        return Err(Error::RequestAlreadyResolved {
            id: request.id,
            status: current.to_string(),
        });
    }

    if resolution.outcome == RequestStatus::Approved {
        debit_team_budget_atomic(db, request.team_budget_id, request.amount).await?;
    }

    let mut model: budget_request::ActiveModel = request.into();
    model.status = Set(resolution.outcome.to_string());
    model.reviewed_at = Set(Some(chrono::Utc::now()));
    model.reviewed_by = Set(Some(resolution.reviewer));
    model.review_notes = Set(resolution.notes);
    model.auto_approved_by_rule = Set(resolution.rule_id);

    model.update(db).await.map_err(Into::into)
}

async fn resolve_request(
    db: &DatabaseConnection,
    request_id: i64,
    resolution: Resolution,
) -> Result<budget_request::Model> {
    let txn = db.begin().await?;
    let request = BudgetRequest::find_by_id(request_id)
        .one(&txn)
        .await?
        .ok_or(Error::RequestNotFound { id: request_id })?;

    let resolved = resolve_request_on(&txn, request, resolution).await?;
    txn.commit().await?;
    info!(request_id, status = %resolved.status, "Resolved budget request");
    Ok(resolved)
}

/// Approves a pending request and debits the team balance by its amount.
#[instrument(skip(db, notes))]
pub async fn approve_request(
    db: &DatabaseConnection,
    request_id: i64,
    reviewer: &str,
    notes: Option<String>,
) -> Result<budget_request::Model> {
    resolve_request(
        db,
        request_id,
        Resolution {
            outcome: RequestStatus::Approved,
            reviewer: validate_text(reviewer, "Reviewer")?,
            notes: normalize_notes(notes),
            rule_id: None,
        },
    )
    .await
}

/// Rejects a pending request. The team balance is unchanged.
#[instrument(skip(db, notes))]
pub async fn reject_request(
    db: &DatabaseConnection,
    request_id: i64,
    reviewer: &str,
    notes: Option<String>,
) -> Result<budget_request::Model> {
    resolve_request(
        db,
        request_id,
        Resolution {
            outcome: RequestStatus::Rejected,
            reviewer: validate_text(reviewer, "Reviewer")?,
            notes: normalize_notes(notes),
            rule_id: None,
        },
    )
    .await
}

/// Evaluates the company's active approval rules against a pending request.
///
/// The candidate is `{ value: amount }`. On [`RuleDecision::AutoApprove`] the request is
/// approved in the same transaction with reviewer `rule:<id>`; for any other decision the
/// request is left pending and the decision is returned for a human to act on.
#[instrument(skip(db))]
pub async fn apply_auto_approval(db: &DatabaseConnection, request_id: i64) -> Result<RuleDecision> {
    let txn = db.begin().await?;
    let request = BudgetRequest::find_by_id(request_id)
        .one(&txn)
        .await?
        .ok_or(Error::RequestNotFound { id: request_id })?;

    let current = request.status()?;
    if current != RequestStatus::Pending {
        return Err(Error::RequestAlreadyResolved {
            id: request_id,
            status: current.to_string(),
        });
    }

    let team = TeamBudget::find_by_id(request.team_budget_id)
        .one(&txn)
        .await?
        .ok_or(Error::TeamBudgetIdNotFound {
            id: request.team_budget_id,
        })?;

    let rules = get_active_approval_rules(&txn, &team.company_id).await?;
    let candidate = Candidate::new().with(ConditionField::Value, request.amount);
    let decision = evaluate_rules(&rules, &candidate)?;
    debug!(?decision, "Evaluated approval rules");

    if let RuleDecision::AutoApprove { rule_id, rule_name } = &decision {
        resolve_request_on(
            &txn,
            request,
            Resolution {
                outcome: RequestStatus::Approved,
                reviewer: format!("rule:{rule_id}"),
                notes: Some(format!("Auto-approved by rule '{rule_name}'")),
                rule_id: Some(*rule_id),
            },
        )
        .await?;
        info!(request_id, rule_id, "Request auto-approved");
    }

    txn.commit().await?;
    Ok(decision)
}

/// Adds funds to a team budget and records the allocation.
#[instrument(skip(db, description))]
pub async fn allocate(
    db: &DatabaseConnection,
    team_budget_id: i64,
    amount: f64,
    description: &str,
    allocated_by: &str,
) -> Result<allocation::Model> {
    validate_positive(amount)?;
    let description = validate_text(description, "Allocation description")?;
    let allocated_by = validate_text(allocated_by, "Allocator")?;

    let txn = db.begin().await?;
    credit_team_budget_atomic(&txn, team_budget_id, amount).await?;

    let model = allocation::ActiveModel {
        team_budget_id: Set(team_budget_id),
        amount: Set(amount),
        description: Set(description),
        allocated_by: Set(allocated_by),
        allocated_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let created = model.insert(&txn).await?;
    txn.commit().await?;

    info!(allocation_id = created.id, "Allocated funds to team budget");
    Ok(created)
}

/// Allocation history of a team, newest first.
pub async fn get_allocations_for_team(
    db: &DatabaseConnection,
    team_budget_id: i64,
) -> Result<Vec<allocation::Model>> {
    Allocation::find()
        .filter(allocation::Column::TeamBudgetId.eq(team_budget_id))
        .order_by_desc(allocation::Column::AllocatedAt)
        .order_by_desc(allocation::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
