//! Team budget entity - A per-team running balance that funding requests draw against.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Team budget database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "team_budgets")]
pub struct Model {
    /// Unique identifier for the ledger
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Company that owns the team
    pub company_id: String,
    /// External team identifier, unique across the store
    #[sea_orm(unique)]
    pub team_id: String,
    /// Display name of the team
    pub team_name: String,
    /// Balance still available for approval
    pub available_amount: f64,
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `TeamBudget` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One team budget has many funding requests
    #[sea_orm(has_many = "super::budget_request::Entity")]
    Requests,
    /// One team budget has many allocations
    #[sea_orm(has_many = "super::allocation::Entity")]
    Allocations,
}

impl Related<super::budget_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requests.def()
    }
}

impl Related<super::allocation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Allocations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
