//! Replication log entity - Append-only audit trail of catalog replication runs.
//!
//! A row is written once per run and never updated. The summary counters are flattened into
//! columns; per-item `results` and `errors` are stored as JSON text.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Replication log database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "replication_logs")]
pub struct Model {
    /// Unique identifier for the log entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Company whose product records were written
    pub company_id: String,
    /// Budget that triggered the run, if any
    pub budget_id: Option<i64>,
    /// What was replicated (e.g., `"replicate_budget"`)
    pub action: String,
    /// Outcome: `success`, `partial` or `failed`
    pub status: String,
    pub total: i32,
    pub created: i32,
    pub updated: i32,
    pub skipped: i32,
    pub failed: i32,
    /// JSON array of error messages
    pub errors: Option<String>,
    /// JSON array of per-item outcomes
    pub results: Option<String>,
    /// When the run was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `ReplicationLog` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A log entry may reference the budget that was replicated
    #[sea_orm(
        belongs_to = "super::budget::Entity",
        from = "Column::BudgetId",
        to = "super::budget::Column::Id"
    )]
    Budget,
}

impl Related<super::budget::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budget.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
