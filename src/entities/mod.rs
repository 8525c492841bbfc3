//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod allocation;
pub mod approval_rule;
pub mod budget;
pub mod budget_request;
pub mod replication_log;
pub mod team_budget;

// Re-export specific types to avoid conflicts
pub use allocation::{Column as AllocationColumn, Entity as Allocation, Model as AllocationModel};
pub use approval_rule::{
    Column as ApprovalRuleColumn, Entity as ApprovalRule, Model as ApprovalRuleModel,
};
pub use budget::{Column as BudgetColumn, Entity as Budget, Model as BudgetModel};
pub use budget_request::{
    Column as BudgetRequestColumn, Entity as BudgetRequest, Model as BudgetRequestModel,
};
pub use replication_log::{
    Column as ReplicationLogColumn, Entity as ReplicationLog, Model as ReplicationLogModel,
};
pub use team_budget::{Column as TeamBudgetColumn, Entity as TeamBudget, Model as TeamBudgetModel};
