//! Replication business logic - Audit trail of pushing released budgets into company catalogs.
//!
//! The catalog writes themselves happen elsewhere; this module receives their per-item
//! outcomes, derives a summary and status, and appends a log entry. Log entries are never
//! updated or deleted. [`replicate_budget`] also finishes the budget lifecycle by moving a
//! `released` budget to `replicated` when the run did not fail outright.

use crate::{
    core::budget::{BudgetStatus, transition_budget_on},
    entities::{Budget, ReplicationLog, budget, replication_log},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::{info, instrument, warn};

/// Action name recorded by [`replicate_budget`].
pub const REPLICATE_BUDGET_ACTION: &str = "replicate_budget";

/// Overall outcome of a replication run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicationStatus {
    Success,
    Partial,
    Failed,
}

impl ReplicationStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ReplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplicationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "success" => Ok(Self::Success),
            "partial" => Ok(Self::Partial),
            "failed" => Ok(Self::Failed),
            other => Err(Error::validation(format!(
                "Unknown replication status: {other}"
            ))),
        }
    }
}

/// What happened to one catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemOutcome {
    Created,
    Updated,
    Skipped,
    Failed,
}

/// Result of replicating a single base-catalog item into a company product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    pub product_id: String,
    pub outcome: ItemOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ItemResult {
    pub fn new(product_id: impl Into<String>, outcome: ItemOutcome) -> Self {
        Self {
            product_id: product_id.into(),
            outcome,
            message: None,
        }
    }

    pub fn failed(product_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            outcome: ItemOutcome::Failed,
            message: Some(message.into()),
        }
    }
}

/// Counters of a replication run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationSummary {
    pub total: i32,
    pub created: i32,
    pub updated: i32,
    pub skipped: i32,
    pub failed: i32,
}

impl ReplicationSummary {
    /// Counts outcomes.
    pub fn from_results(results: &[ItemResult]) -> Result<Self> {
        let count = |outcome: ItemOutcome| -> Result<i32> {
            Ok(i32::try_from(
                results.iter().filter(|r| r.outcome == outcome).count(),
            )?)
        };
        Ok(Self {
            total: i32::try_from(results.len())?,
            created: count(ItemOutcome::Created)?,
            updated: count(ItemOutcome::Updated)?,
            skipped: count(ItemOutcome::Skipped)?,
            failed: count(ItemOutcome::Failed)?,
        })
    }

    /// No failures is a success; failures alongside written items is partial; anything else
    /// failed.
    #[must_use]
    pub const fn status(&self) -> ReplicationStatus {
        if self.failed == 0 {
            ReplicationStatus::Success
        } else if self.created > 0 || self.updated > 0 {
            ReplicationStatus::Partial
        } else {
            ReplicationStatus::Failed
        }
    }

    /// Checks that no counter is negative and that `total` is the sum of the four outcome
    /// counters.
    pub fn validate(&self) -> Result<()> {
        let counters = [self.created, self.updated, self.skipped, self.failed];
        if self.total < 0 || counters.iter().any(|n| *n < 0) {
            return Err(Error::validation("Replication counters cannot be negative"));
        }

        let sum = counters
            .iter()
            .try_fold(0_i32, |acc, n| acc.checked_add(*n))
            .ok_or_else(|| Error::validation("Replication counters overflow"))?;
        if sum != self.total {
            return Err(Error::validation(format!(
                "Replication total {} does not match its counters ({sum})",
                self.total
            )));
        }
        Ok(())
    }
}

impl replication_log::Model {
    pub fn status(&self) -> Result<ReplicationStatus> {
        self.status.parse()
    }

    #[must_use]
    pub const fn summary(&self) -> ReplicationSummary {
        ReplicationSummary {
            total: self.total,
            created: self.created,
            updated: self.updated,
            skipped: self.skipped,
            failed: self.failed,
        }
    }

    /// Decoded error messages; empty when none were recorded.
    pub fn errors(&self) -> Result<Vec<String>> {
        match self.errors.as_deref() {
            Some(raw) => Ok(serde_json::from_str(raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Decoded per-item outcomes; empty when none were recorded.
    pub fn results(&self) -> Result<Vec<ItemResult>> {
        match self.results.as_deref() {
            Some(raw) => Ok(serde_json::from_str(raw)?),
            None => Ok(Vec::new()),
        }
    }
}

/// Input for [`record_replication`]. The stored status is derived from `summary`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReplicationLog {
    pub company_id: String,
    pub budget_id: Option<i64>,
    pub action: String,
    pub summary: ReplicationSummary,
    pub errors: Vec<String>,
    pub results: Vec<ItemResult>,
}

async fn record_replication_on<C>(db: &C, log: NewReplicationLog) -> Result<replication_log::Model>
where
    C: ConnectionTrait,
{
    if log.company_id.trim().is_empty() {
        return Err(Error::validation("Company id cannot be empty"));
    }
    if log.action.trim().is_empty() {
        return Err(Error::validation("Replication action cannot be empty"));
    }
    log.summary.validate()?;

    let errors = if log.errors.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&log.errors)?)
    };
    let results = if log.results.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&log.results)?)
    };

    let model = replication_log::ActiveModel {
        company_id: Set(log.company_id),
        budget_id: Set(log.budget_id),
        action: Set(log.action),
        status: Set(log.summary.status().to_string()),
        total: Set(log.summary.total),
        created: Set(log.summary.created),
        updated: Set(log.summary.updated),
        skipped: Set(log.summary.skipped),
        failed: Set(log.summary.failed),
        errors: Set(errors),
        results: Set(results),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let created = model.insert(db).await?;
    info!(log_id = created.id, status = %created.status, "Recorded replication run");
    Ok(created)
}

/// Appends a replication log entry.
pub async fn record_replication(
    db: &DatabaseConnection,
    log: NewReplicationLog,
) -> Result<replication_log::Model> {
    record_replication_on(db, log).await
}

pub async fn get_replication_log_by_id(
    db: &DatabaseConnection,
    log_id: i64,
) -> Result<Option<replication_log::Model>> {
    ReplicationLog::find_by_id(log_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Replication history of a company, newest first.
pub async fn get_replication_logs(
    db: &DatabaseConnection,
    company_id: &str,
) -> Result<Vec<replication_log::Model>> {
    ReplicationLog::find()
        .filter(replication_log::Column::CompanyId.eq(company_id))
        .order_by_desc(replication_log::Column::CreatedAt)
        .order_by_desc(replication_log::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Most recent replication run of a company.
pub async fn get_latest_replication_log(
    db: &DatabaseConnection,
    company_id: &str,
) -> Result<Option<replication_log::Model>> {
    ReplicationLog::find()
        .filter(replication_log::Column::CompanyId.eq(company_id))
        .order_by_desc(replication_log::Column::CreatedAt)
        .order_by_desc(replication_log::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Records the outcome of replicating a released budget and completes its lifecycle.
///
/// The budget must be `released`. A `success` or `partial` run moves it to `replicated`; a
/// `failed` run is logged and the budget stays `released` so it can be retried.
#[instrument(skip(db, results), fields(items = results.len()))]
pub async fn replicate_budget(
    db: &DatabaseConnection,
    budget_id: i64,
    results: Vec<ItemResult>,
) -> Result<(replication_log::Model, budget::Model)> {
    let summary = ReplicationSummary::from_results(&results)?;
    let status = summary.status();
    let errors: Vec<String> = results
        .iter()
        .filter(|r| r.outcome == ItemOutcome::Failed)
        .map(|r| {
            r.message.as_ref().map_or_else(
                || format!("{}: replication failed", r.product_id),
                |m| format!("{}: {m}", r.product_id),
            )
        })
        .collect();

    let txn = db.begin().await?;
    let existing = Budget::find_by_id(budget_id)
        .one(&txn)
        .await?
        .ok_or(Error::BudgetNotFound { id: budget_id })?;

    let current = existing.status()?;
    if current != BudgetStatus::Released {
        return Err(Error::InvalidTransition {
            from: current.to_string(),
            to: BudgetStatus::Replicated.to_string(),
        });
    }

    let log = record_replication_on(
        &txn,
        NewReplicationLog {
            company_id: existing.company_id.clone(),
            budget_id: Some(budget_id),
            action: REPLICATE_BUDGET_ACTION.to_string(),
            summary,
            errors,
            results,
        },
    )
    .await?;

    let budget = if status == ReplicationStatus::Failed {
        warn!(budget_id, "Replication failed, budget stays released");
        existing
    } else {
        transition_budget_on(&txn, budget_id, BudgetStatus::Replicated, None).await?
    };

    txn.commit().await?;
    Ok((log, budget))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_summary_status() {
        let success = ReplicationSummary::from_results(&[
            ItemResult::new("p1", ItemOutcome::Created),
            ItemResult::new("p2", ItemOutcome::Skipped),
        ])
        .unwrap();
        assert_eq!(
            success,
            ReplicationSummary {
                total: 2,
                created: 1,
                updated: 0,
                skipped: 1,
                failed: 0,
            }
        );
        assert_eq!(success.status(), ReplicationStatus::Success);

        let partial = ReplicationSummary::from_results(&[
            ItemResult::new("p1", ItemOutcome::Updated),
            ItemResult::failed("p2", "price missing"),
        ])
        .unwrap();
        assert_eq!(partial.status(), ReplicationStatus::Partial);

        let failed = ReplicationSummary::from_results(&[
            ItemResult::new("p1", ItemOutcome::Skipped),
            ItemResult::failed("p2", "price missing"),
        ])
        .unwrap();
        assert_eq!(failed.status(), ReplicationStatus::Failed);

        assert_eq!(
            ReplicationSummary::from_results(&[]).unwrap().status(),
            ReplicationStatus::Success
        );
    }

    #[test]
    fn test_summary_validation() {
        let valid = ReplicationSummary {
            total: 4,
            created: 1,
            updated: 1,
            skipped: 1,
            failed: 1,
        };
        assert!(valid.validate().is_ok());

        let negative = ReplicationSummary {
            total: 1,
            created: -5,
            failed: 9,
            ..Default::default()
        };
        let mismatched = ReplicationSummary {
            total: 3,
            created: 1,
            ..Default::default()
        };
        let overflowing = ReplicationSummary {
            total: i32::MAX,
            created: i32::MAX,
            updated: 1,
            ..Default::default()
        };
        for summary in [negative, mismatched, overflowing] {
            assert!(matches!(
                summary.validate().unwrap_err(),
                Error::Validation { .. }
            ));
        }
    }

    #[tokio::test]
    async fn test_record_rejects_inconsistent_summary() -> Result<()> {
        let db = setup_test_db().await?;

        for summary in [
            ReplicationSummary {
                total: 1,
                created: -5,
                failed: 9,
                ..Default::default()
            },
            ReplicationSummary {
                total: i32::MAX,
                created: i32::MAX,
                updated: 1,
                ..Default::default()
            },
        ] {
            let result = record_replication(
                &db,
                NewReplicationLog {
                    company_id: TEST_COMPANY.to_string(),
                    budget_id: None,
                    action: "sync_catalog".to_string(),
                    summary,
                    errors: Vec::new(),
                    results: Vec::new(),
                },
            )
            .await;
            assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        }

        assert!(get_replication_logs(&db, TEST_COMPANY).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_recorded_status_follows_summary() -> Result<()> {
        let db = setup_test_db().await?;

        let log = record_replication(
            &db,
            NewReplicationLog {
                company_id: TEST_COMPANY.to_string(),
                budget_id: None,
                action: "sync_catalog".to_string(),
                summary: ReplicationSummary {
                    total: 2,
                    skipped: 1,
                    failed: 1,
                    ..Default::default()
                },
                errors: vec!["p2: timeout".to_string()],
                results: Vec::new(),
            },
        )
        .await?;

        assert_eq!(log.status()?, ReplicationStatus::Failed);
        assert_eq!(log.errors()?, vec!["p2: timeout".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_record_and_list_logs() -> Result<()> {
        let db = setup_test_db().await?;

        let log = record_replication(
            &db,
            NewReplicationLog {
                company_id: TEST_COMPANY.to_string(),
                budget_id: None,
                action: "sync_catalog".to_string(),
                summary: ReplicationSummary {
                    total: 3,
                    created: 3,
                    ..Default::default()
                },
                errors: Vec::new(),
                results: Vec::new(),
            },
        )
        .await?;

        assert_eq!(log.status()?, ReplicationStatus::Success);
        assert_eq!(log.summary().created, 3);
        assert!(log.errors.is_none());
        assert!(log.errors()?.is_empty());

        let logs = get_replication_logs(&db, TEST_COMPANY).await?;
        assert_eq!(logs, vec![log.clone()]);
        assert_eq!(get_latest_replication_log(&db, TEST_COMPANY).await?, Some(log));
        assert!(get_replication_logs(&db, "other-co").await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_replicate_released_budget() -> Result<()> {
        let (db, budget) = setup_with_budget().await?;
        advance_to_released(&db, budget.id).await?;

        let results = vec![
            ItemResult::new("p1", ItemOutcome::Created),
            ItemResult::new("p2", ItemOutcome::Updated),
            ItemResult::failed("p3", "missing SKU"),
        ];
        let (log, replicated) = replicate_budget(&db, budget.id, results.clone()).await?;

        assert_eq!(log.status()?, ReplicationStatus::Partial);
        assert_eq!(log.budget_id, Some(budget.id));
        assert_eq!(log.company_id, budget.company_id);
        assert_eq!(log.action, REPLICATE_BUDGET_ACTION);
        assert_eq!(log.errors()?, vec!["p3: missing SKU".to_string()]);
        assert_eq!(log.results()?, results);
        assert_eq!(replicated.status()?, BudgetStatus::Replicated);

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_replication_keeps_budget_released() -> Result<()> {
        let (db, budget) = setup_with_budget().await?;
        advance_to_released(&db, budget.id).await?;

        let (log, unchanged) =
            replicate_budget(&db, budget.id, vec![ItemResult::failed("p1", "timeout")]).await?;
        assert_eq!(log.status()?, ReplicationStatus::Failed);
        assert_eq!(unchanged.status()?, BudgetStatus::Released);

        // Retry succeeds and appends a second entry
        let (_, replicated) = replicate_budget(
            &db,
            budget.id,
            vec![ItemResult::new("p1", ItemOutcome::Created)],
        )
        .await?;
        assert_eq!(replicated.status()?, BudgetStatus::Replicated);
        assert_eq!(get_replication_logs(&db, TEST_COMPANY).await?.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_replicate_requires_released_budget() -> Result<()> {
        let (db, budget) = setup_with_budget().await?;

        let result = replicate_budget(&db, budget.id, Vec::new()).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidTransition { ref from, .. } if from == "draft"
        ));
        assert!(get_replication_logs(&db, TEST_COMPANY).await?.is_empty());

        Ok(())
    }
}
