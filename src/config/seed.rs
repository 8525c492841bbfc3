//! Seed configuration loading from config.toml
//!
//! The configuration file lists companies together with the approval rules and team budgets
//! they should start with. Seeding is idempotent: rules are matched by name and team budgets
//! by team id, and existing ones are left untouched.

use crate::{
    core::{
        approval_rule::{NewApprovalRule, create_approval_rule, get_approval_rules},
        ledger::{create_team_budget, get_team_budget_by_team_id},
    },
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Companies to seed
    #[serde(default)]
    pub companies: Vec<CompanyConfig>,
}

/// Seed data for one company
#[derive(Debug, Clone, Deserialize)]
pub struct CompanyConfig {
    pub company_id: String,
    #[serde(default)]
    pub approval_rules: Vec<NewApprovalRule>,
    #[serde(default)]
    pub team_budgets: Vec<TeamBudgetConfig>,
}

/// Seed data for one team ledger
#[derive(Debug, Clone, Deserialize)]
pub struct TeamBudgetConfig {
    pub team_id: String,
    pub team_name: String,
    #[serde(default)]
    pub initial_amount: f64,
}

/// What [`seed_from_config`] created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub rules_created: usize,
    pub teams_created: usize,
}

/// Loads seed configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    debug!("Loading configuration from {:?}", path);
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;

    parse_config(&contents)
}

/// Parses seed configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<Config> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Creates the rules and team budgets of `config` that do not exist yet.
#[instrument(skip_all)]
pub async fn seed_from_config(db: &DatabaseConnection, config: &Config) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for company in &config.companies {
        let existing: Vec<String> = get_approval_rules(db, &company.company_id)
            .await?
            .into_iter()
            .map(|rule| rule.name)
            .collect();

        for rule in &company.approval_rules {
            if existing.iter().any(|name| name == rule.name.trim()) {
                debug!(company = %company.company_id, rule = %rule.name, "Rule already seeded");
                continue;
            }
            create_approval_rule(db, &company.company_id, rule.clone()).await?;
            report.rules_created += 1;
        }

        for team in &company.team_budgets {
            if get_team_budget_by_team_id(db, team.team_id.trim())
                .await?
                .is_some()
            {
                debug!(team = %team.team_id, "Team budget already seeded");
                continue;
            }
            create_team_budget(
                db,
                &company.company_id,
                &team.team_id,
                &team.team_name,
                team.initial_amount,
            )
            .await?;
            report.teams_created += 1;
        }
    }

    info!(
        rules = report.rules_created,
        teams = report.teams_created,
        "Seeding complete"
    );
    Ok(report)
}
