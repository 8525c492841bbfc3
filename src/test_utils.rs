//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        approval_rule::{self, NewApprovalRule},
        budget, ledger,
        condition::ApprovalCondition,
    },
    entities,
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Company used by tests unless they need a second tenant.
pub const TEST_COMPANY: &str = "acme";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a draft budget with sensible defaults.
///
/// # Defaults
/// * `total_cash`: 1000.0
/// * `total_points`: 5000
pub async fn create_test_budget(
    db: &DatabaseConnection,
    company_id: &str,
    title: &str,
) -> Result<entities::budget::Model> {
    budget::create_budget(db, company_id, title, 1000.0, 5000).await
}

/// Walks a draft budget through submit, review, approve and release.
pub async fn advance_to_released(
    db: &DatabaseConnection,
    budget_id: i64,
) -> Result<entities::budget::Model> {
    budget::submit_budget(db, budget_id).await?;
    budget::review_budget(db, budget_id).await?;
    budget::approve_budget(db, budget_id).await?;
    budget::release_budget(db, budget_id).await
}

/// Creates an approval rule.
///
/// # Defaults
/// * `description`: empty
/// * `max_value`: None
/// * `approver_roles`: `["manager"]`
pub async fn create_test_rule(
    db: &DatabaseConnection,
    company_id: &str,
    name: &str,
    conditions: Vec<ApprovalCondition>,
    auto_approve: bool,
) -> Result<entities::approval_rule::Model> {
    approval_rule::create_approval_rule(
        db,
        company_id,
        NewApprovalRule {
            name: name.to_string(),
            auto_approve,
            conditions,
            approver_roles: vec!["manager".to_string()],
            ..Default::default()
        },
    )
    .await
}

/// Creates a team budget for [`TEST_COMPANY`] named after its id.
pub async fn create_test_team(
    db: &DatabaseConnection,
    team_id: &str,
    initial_amount: f64,
) -> Result<entities::team_budget::Model> {
    ledger::create_team_budget(db, TEST_COMPANY, team_id, team_id, initial_amount).await
}

/// Submits a pending request from `"test_user"`.
pub async fn create_test_request(
    db: &DatabaseConnection,
    team_budget_id: i64,
    amount: f64,
) -> Result<entities::budget_request::Model> {
    ledger::submit_request(db, team_budget_id, "test_user", amount, "Test request").await
}

/// Sets up a complete test environment with a draft budget.
/// Returns (db, budget) for common test scenarios.
pub async fn setup_with_budget() -> Result<(DatabaseConnection, entities::budget::Model)> {
    let db = setup_test_db().await?;
    let budget = create_test_budget(&db, TEST_COMPANY, "Test Budget").await?;
    Ok((db, budget))
}

/// Sets up a test environment with a team budget holding 1000.0.
pub async fn setup_with_team() -> Result<(DatabaseConnection, entities::team_budget::Model)> {
    let db = setup_test_db().await?;
    let team = create_test_team(&db, "team-test", 1000.0).await?;
    Ok((db, team))
}
