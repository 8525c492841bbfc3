//! Budget entity - A company's funding container moving through the approval lifecycle.
//!
//! The `status` column stores the lowercase name of a
//! [`BudgetStatus`](crate::core::budget::BudgetStatus). Each lifecycle step stamps its own
//! timestamp column so the history of a budget can be read back from a single row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Budget database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    /// Unique identifier for the budget
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Company the budget belongs to
    pub company_id: String,
    /// Human-readable title (e.g., "Q3 onboarding kits")
    pub title: String,
    /// Cash amount requested by the budget
    pub total_cash: f64,
    /// Reward points requested by the budget
    pub total_points: i64,
    /// Lifecycle status: `draft`, `submitted`, `reviewed`, `approved`, `rejected`,
    /// `released` or `replicated`
    pub status: String,
    /// When the manager created the draft
    pub created_at: DateTimeUtc,
    pub submitted_at: Option<DateTimeUtc>,
    pub reviewed_at: Option<DateTimeUtc>,
    pub approved_at: Option<DateTimeUtc>,
    pub rejected_at: Option<DateTimeUtc>,
    pub released_at: Option<DateTimeUtc>,
    pub replicated_at: Option<DateTimeUtc>,
    /// Reason given by the reviewer when the budget was rejected
    pub rejection_reason: Option<String>,
}

/// Defines relationships between Budget and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One budget has many replication runs
    #[sea_orm(has_many = "super::replication_log::Entity")]
    ReplicationLogs,
}

impl Related<super::replication_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReplicationLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
