//! Allocation entity - Funds added to a team budget.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Allocation database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "allocations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub team_budget_id: i64,
    /// Amount added to the team's available balance
    pub amount: f64,
    pub description: String,
    pub allocated_by: String,
    pub allocated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
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
