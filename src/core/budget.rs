//! Budget business logic - The budget lifecycle state machine.
//!
//! A budget moves `draft → submitted → reviewed → {approved | rejected}` and then
//! `approved → released → replicated`. [`BudgetStatus::can_transition`] is the only place the
//! legal moves are defined, and every lifecycle operation checks it inside a database
//! transaction before writing. `rejected` and `replicated` are terminal. Transitions never
//! touch `total_cash` or `total_points`; only drafts can be edited or deleted.

use crate::{
    entities::{Budget, budget},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::{info, instrument};

/// Lifecycle status of a budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Draft,
    Submitted,
    Reviewed,
    Approved,
    Rejected,
    Released,
    Replicated,
}

impl BudgetStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Draft,
        Self::Submitted,
        Self::Reviewed,
        Self::Approved,
        Self::Rejected,
        Self::Released,
        Self::Replicated,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Reviewed => "reviewed",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Released => "released",
            Self::Replicated => "replicated",
        }
    }

    /// The transition table.
    #[must_use]
    pub const fn can_transition(from: Self, to: Self) -> bool {
        matches!(
            (from, to),
            (Self::Draft, Self::Submitted)
                | (Self::Submitted, Self::Reviewed)
                | (Self::Reviewed, Self::Approved | Self::Rejected)
                | (Self::Approved, Self::Released)
                | (Self::Released, Self::Replicated)
        )
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Replicated)
    }

    /// Whether the budget's funds count as committed for the company.
    #[must_use]
    pub const fn is_committed(self) -> bool {
        matches!(self, Self::Approved | Self::Released | Self::Replicated)
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::validation(format!("Unknown budget status: {s}")))
    }
}

impl budget::Model {
    /// Parses the stored status column.
    pub fn status(&self) -> Result<BudgetStatus> {
        self.status.parse()
    }
}

#[allow(clippy::cast_precision_loss)]
fn validate_amounts(total_cash: f64, total_points: i64) -> Result<()> {
    if !total_cash.is_finite() || total_cash < 0.0 {
        return Err(Error::InvalidAmount { amount: total_cash });
    }
    if total_points < 0 {
        return Err(Error::InvalidAmount {
            amount: total_points as f64,
        });
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("Budget title cannot be empty"));
    }
    Ok(trimmed.to_string())
}

/// Creates a budget in `draft` for a company.
#[instrument(skip(db))]
pub async fn create_budget(
    db: &DatabaseConnection,
    company_id: &str,
    title: &str,
    total_cash: f64,
    total_points: i64,
) -> Result<budget::Model> {
    let title = validate_title(title)?;
    validate_amounts(total_cash, total_points)?;
    if company_id.trim().is_empty() {
        return Err(Error::validation("Company id cannot be empty"));
    }

    let model = budget::ActiveModel {
        company_id: Set(company_id.to_string()),
        title: Set(title),
        total_cash: Set(total_cash),
        total_points: Set(total_points),
        status: Set(BudgetStatus::Draft.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let created = model.insert(db).await?;
    info!(budget_id = created.id, "Created draft budget");
    Ok(created)
}

/// Retrieves a budget by id.
pub async fn get_budget_by_id(
    db: &DatabaseConnection,
    budget_id: i64,
) -> Result<Option<budget::Model>> {
    Budget::find_by_id(budget_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// All budgets of a company, newest first.
pub async fn get_budgets_for_company(
    db: &DatabaseConnection,
    company_id: &str,
) -> Result<Vec<budget::Model>> {
    Budget::find()
        .filter(budget::Column::CompanyId.eq(company_id))
        .order_by_desc(budget::Column::CreatedAt)
        .order_by_desc(budget::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Budgets in a given status across all companies, oldest first (review queue order).
pub async fn get_budgets_by_status(
    db: &DatabaseConnection,
    status: BudgetStatus,
) -> Result<Vec<budget::Model>> {
    Budget::find()
        .filter(budget::Column::Status.eq(status.as_str()))
        .order_by_asc(budget::Column::CreatedAt)
        .order_by_asc(budget::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads a budget and checks that it may move to `to`.
async fn load_for_transition<C>(db: &C, budget_id: i64, to: BudgetStatus) -> Result<budget::Model>
where
    C: ConnectionTrait,
{
    let existing = Budget::find_by_id(budget_id)
        .one(db)
        .await?
        .ok_or(Error::BudgetNotFound { id: budget_id })?;

    let from = existing.status()?;
    if !BudgetStatus::can_transition(from, to) {
        return Err(Error::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    Ok(existing)
}

/// Moves a budget to `to`, stamping the matching timestamp column.
///
/// Works on any connection so it can join a caller's transaction.
pub(crate) async fn transition_budget_on<C>(
    db: &C,
    budget_id: i64,
    to: BudgetStatus,
    rejection_reason: Option<String>,
) -> Result<budget::Model>
where
    C: ConnectionTrait,
{
    let existing = load_for_transition(db, budget_id, to).await?;
    let from = existing.status.clone();

    let now: DateTime<Utc> = Utc::now();
    let mut model: budget::ActiveModel = existing.into();
    model.status = Set(to.to_string());
    match to {
        BudgetStatus::Submitted => model.submitted_at = Set(Some(now)),
        BudgetStatus::Reviewed => model.reviewed_at = Set(Some(now)),
        BudgetStatus::Approved => model.approved_at = Set(Some(now)),
        BudgetStatus::Rejected => {
            model.rejected_at = Set(Some(now));
            model.rejection_reason = Set(rejection_reason);
        }
        BudgetStatus::Released => model.released_at = Set(Some(now)),
        BudgetStatus::Replicated => model.replicated_at = Set(Some(now)),
        BudgetStatus::Draft => {}
    }

    let updated = model.update(db).await?;
    info!(budget_id, %from, to = %to, "Budget transitioned");
    Ok(updated)
}

/// Moves a budget to `to` in its own database transaction.
pub async fn transition_budget(
    db: &DatabaseConnection,
    budget_id: i64,
    to: BudgetStatus,
) -> Result<budget::Model> {
    let txn = db.begin().await?;
    let updated = transition_budget_on(&txn, budget_id, to, None).await?;
    txn.commit().await?;
    Ok(updated)
}

/// `draft → submitted`: the manager sends the budget for review.
pub async fn submit_budget(db: &DatabaseConnection, budget_id: i64) -> Result<budget::Model> {
    transition_budget(db, budget_id, BudgetStatus::Submitted).await
}

/// `submitted → reviewed`: an administrator has looked at the budget.
pub async fn review_budget(db: &DatabaseConnection, budget_id: i64) -> Result<budget::Model> {
    transition_budget(db, budget_id, BudgetStatus::Reviewed).await
}

/// `reviewed → approved`.
pub async fn approve_budget(db: &DatabaseConnection, budget_id: i64) -> Result<budget::Model> {
    transition_budget(db, budget_id, BudgetStatus::Approved).await
}

/// `reviewed → rejected`. Terminal.
pub async fn reject_budget(
    db: &DatabaseConnection,
    budget_id: i64,
    reason: Option<String>,
) -> Result<budget::Model> {
    let reason = reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    let txn = db.begin().await?;
    let updated = transition_budget_on(&txn, budget_id, BudgetStatus::Rejected, reason).await?;
    txn.commit().await?;
    Ok(updated)
}

/// `approved → released`: funds are released and the budget is ready for replication.
pub async fn release_budget(db: &DatabaseConnection, budget_id: i64) -> Result<budget::Model> {
    transition_budget(db, budget_id, BudgetStatus::Released).await
}

/// `released → replicated`. Normally driven by
/// [`replicate_budget`](crate::core::replication::replicate_budget).
pub async fn mark_budget_replicated(
    db: &DatabaseConnection,
    budget_id: i64,
) -> Result<budget::Model> {
    transition_budget(db, budget_id, BudgetStatus::Replicated).await
}

/// Edits title and amounts of a budget that is still a draft.
#[instrument(skip(db))]
pub async fn update_draft_budget(
    db: &DatabaseConnection,
    budget_id: i64,
    title: Option<String>,
    total_cash: Option<f64>,
    total_points: Option<i64>,
) -> Result<budget::Model> {
    let title = title.as_deref().map(validate_title).transpose()?;

    let txn = db.begin().await?;
    let existing = Budget::find_by_id(budget_id)
        .one(&txn)
        .await?
        .ok_or(Error::BudgetNotFound { id: budget_id })?;

    let status = existing.status()?;
    if status != BudgetStatus::Draft {
        return Err(Error::validation(format!(
            "Only draft budgets can be edited (budget {budget_id} is {status})"
        )));
    }
    validate_amounts(
        total_cash.unwrap_or(existing.total_cash),
        total_points.unwrap_or(existing.total_points),
    )?;

    let mut model: budget::ActiveModel = existing.into();
    if let Some(title) = title {
        model.title = Set(title);
    }
    if let Some(cash) = total_cash {
        model.total_cash = Set(cash);
    }
    if let Some(points) = total_points {
        model.total_points = Set(points);
    }

    let updated = model.update(&txn).await?;
    txn.commit().await?;
    Ok(updated)
}

/// Deletes a budget that is still a draft.
#[instrument(skip(db))]
pub async fn delete_draft_budget(db: &DatabaseConnection, budget_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let existing = Budget::find_by_id(budget_id)
        .one(&txn)
        .await?
        .ok_or(Error::BudgetNotFound { id: budget_id })?;

    let status = existing.status()?;
    if status != BudgetStatus::Draft {
        return Err(Error::validation(format!(
            "Only draft budgets can be deleted (budget {budget_id} is {status})"
        )));
    }

    existing.delete(&txn).await?;
    txn.commit().await?;
    info!("Deleted draft budget");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_transition_table() {
        use super::BudgetStatus::{
            Approved, Draft, Rejected, Released, Replicated, Reviewed, Submitted,
        };

        let legal = [
            (Draft, Submitted),
            (Submitted, Reviewed),
            (Reviewed, Approved),
            (Reviewed, Rejected),
            (Approved, Released),
            (Released, Replicated),
        ];

        for from in BudgetStatus::ALL {
            for to in BudgetStatus::ALL {
                assert_eq!(
                    BudgetStatus::can_transition(from, to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }

        for terminal in [Rejected, Replicated] {
            assert!(terminal.is_terminal());
            assert!(
                BudgetStatus::ALL
                    .iter()
                    .all(|to| !BudgetStatus::can_transition(terminal, *to))
            );
        }
    }

    #[test]
    fn test_status_parsing() {
        for status in BudgetStatus::ALL {
            assert_eq!(status.as_str().parse::<BudgetStatus>().unwrap(), status);
        }
        assert!("archived".parse::<BudgetStatus>().is_err());
    }

    #[tokio::test]
    async fn test_create_budget_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_budget(&db, TEST_COMPANY, "  ", 10.0, 0).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let result = create_budget(&db, TEST_COMPANY, "Kits", -1.0, 0).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidAmount { amount: -1.0 }
        ));

        let result = create_budget(&db, TEST_COMPANY, "Kits", f64::NAN, 0).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidAmount { amount: _ }
        ));

        let result = create_budget(&db, TEST_COMPANY, "Kits", 10.0, -5).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidAmount { amount: -5.0 }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_transition_on_missing_budget() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([Vec::<budget::Model>::new()])
            .into_connection();

        let result = submit_budget(&db, 42).await;
        assert!(matches!(result.unwrap_err(), Error::BudgetNotFound { id: 42 }));

        Ok(())
    }

    #[tokio::test]
    async fn test_full_lifecycle() -> Result<()> {
        let (db, budget) = setup_with_budget().await?;
        assert_eq!(budget.status()?, BudgetStatus::Draft);

        let submitted = submit_budget(&db, budget.id).await?;
        assert_eq!(submitted.status()?, BudgetStatus::Submitted);
        assert!(submitted.submitted_at.is_some());

        let reviewed = review_budget(&db, budget.id).await?;
        assert!(reviewed.reviewed_at.is_some());

        let approved = approve_budget(&db, budget.id).await?;
        assert_eq!(approved.status()?, BudgetStatus::Approved);
        assert!(approved.approved_at.is_some());
        assert_eq!(approved.total_cash, budget.total_cash);
        assert_eq!(approved.total_points, budget.total_points);

        let released = release_budget(&db, budget.id).await?;
        assert!(released.released_at.is_some());

        let replicated = mark_budget_replicated(&db, budget.id).await?;
        assert_eq!(replicated.status()?, BudgetStatus::Replicated);
        assert!(replicated.replicated_at.is_some());
        assert_eq!(replicated.total_cash, budget.total_cash);

        Ok(())
    }

    #[tokio::test]
    async fn test_cannot_skip_to_approved() -> Result<()> {
        let (db, budget) = setup_with_budget().await?;

        let result = approve_budget(&db, budget.id).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidTransition { ref from, ref to } if from == "draft" && to == "approved"
        ));

        submit_budget(&db, budget.id).await?;
        assert!(approve_budget(&db, budget.id).await.is_err());

        let stored = get_budget_by_id(&db, budget.id).await?.unwrap();
        assert_eq!(stored.status()?, BudgetStatus::Submitted);
        assert!(stored.approved_at.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_is_terminal() -> Result<()> {
        let (db, budget) = setup_with_budget().await?;
        submit_budget(&db, budget.id).await?;
        review_budget(&db, budget.id).await?;

        let reason = Some(" Over quarterly cap ".to_string());
        let rejected = reject_budget(&db, budget.id, reason).await?;
        assert_eq!(rejected.status()?, BudgetStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Over quarterly cap"));
        assert!(rejected.rejected_at.is_some());

        assert!(approve_budget(&db, budget.id).await.is_err());
        assert!(release_budget(&db, budget.id).await.is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_delete_only_drafts() -> Result<()> {
        let (db, budget) = setup_with_budget().await?;

        let edited =
            update_draft_budget(&db, budget.id, Some("Renamed".to_string()), Some(750.0), None)
                .await?;
        assert_eq!(edited.title, "Renamed");
        assert_eq!(edited.total_cash, 750.0);
        assert_eq!(edited.total_points, budget.total_points);

        submit_budget(&db, budget.id).await?;
        let result = update_draft_budget(&db, budget.id, None, Some(1.0), None).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        let result = delete_draft_budget(&db, budget.id).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let draft = create_test_budget(&db, TEST_COMPANY, "Disposable").await?;
        delete_draft_budget(&db, draft.id).await?;
        assert!(get_budget_by_id(&db, draft.id).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_queries_by_company_and_status() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_test_budget(&db, TEST_COMPANY, "First").await?;
        let second = create_test_budget(&db, TEST_COMPANY, "Second").await?;
        create_test_budget(&db, "other-co", "Elsewhere").await?;
        submit_budget(&db, second.id).await?;

        let company = get_budgets_for_company(&db, TEST_COMPANY).await?;
        assert_eq!(company.len(), 2);
        assert_eq!(company[0].id, second.id);
        assert_eq!(company[1].id, first.id);

        let submitted = get_budgets_by_status(&db, BudgetStatus::Submitted).await?;
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].id, second.id);

        Ok(())
    }
}
