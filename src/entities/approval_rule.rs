//! Approval rule entity - Named, company-scoped condition sets used to pre-approve requests.
//!
//! `conditions` and `approver_roles` are JSON arrays stored as text. Use
//! [`Model::conditions`] and [`Model::approver_roles`] to read them back as typed values.

use crate::core::condition::ApprovalCondition;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Approval rule database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "approval_rules")]
pub struct Model {
    /// Unique identifier for the rule
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Company the rule applies to; never changes after creation
    pub company_id: String,
    /// Display name, never empty
    pub name: String,
    pub description: String,
    /// Whether a match approves the request without a human reviewer
    pub auto_approve: bool,
    /// Upper bound on the candidate `value` for auto-approval
    pub max_value: Option<f64>,
    /// JSON array of [`ApprovalCondition`]
    pub conditions: String,
    /// JSON array of role names allowed to approve manually
    pub approver_roles: String,
    /// Inactive rules are kept but never evaluated
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Decodes the stored condition list.
    pub fn conditions(&self) -> crate::errors::Result<Vec<ApprovalCondition>> {
        Ok(serde_json::from_str(&self.conditions)?)
    }

    /// Decodes the stored approver roles.
    pub fn approver_roles(&self) -> crate::errors::Result<Vec<String>> {
        Ok(serde_json::from_str(&self.approver_roles)?)
    }
}

/// `ApprovalRule` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
