//! Budget request entity - A discrete funding request against a team budget.
//!
//! Each request is resolved at most once: `status` starts as `pending` and moves to either
//! `approved` or `rejected`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Budget request database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "budget_requests")]
pub struct Model {
    /// Unique identifier for the request
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Ledger the request draws from
    pub team_budget_id: i64,
    /// User who asked for the funds
    pub requested_by: String,
    /// Requested amount, always positive
    pub amount: f64,
    /// Why the funds are needed
    pub reason: String,
    /// `pending`, `approved` or `rejected`
    pub status: String,
    pub requested_at: DateTimeUtc,
    pub reviewed_at: Option<DateTimeUtc>,
    /// Reviewer identity; `rule:<id>` when resolved by an approval rule
    pub reviewed_by: Option<String>,
    pub review_notes: Option<String>,
    /// Approval rule that auto-approved the request, if any
    pub auto_approved_by_rule: Option<i64>,
}

/// Defines relationships between `BudgetRequest` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each request belongs to one team budget
    #[sea_orm(
        belongs_to = "super::team_budget::Entity",
        from = "Column::TeamBudgetId",
        to = "super::team_budget::Column::Id"
    )]
    TeamBudget,
}

impl Related<super::team_budget::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TeamBudget.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
