//! Approval rule business logic - Storage and evaluation of company approval rules.
//!
//! Rules are scoped to a company when created and keep that scope for life. Updates are
//! partial merges, toggling a rule on or off is its own operation, and deletion is a hard
//! delete. [`evaluate_rules`] decides what the active rules say about a candidate request.

use crate::{
    core::condition::{ApprovalCondition, Candidate, all_conditions_match},
    entities::{ApprovalRule, approval_rule},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Input for [`create_approval_rule`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewApprovalRule {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub auto_approve: bool,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub conditions: Vec<ApprovalCondition>,
    #[serde(default)]
    pub approver_roles: Vec<String>,
}

/// Partial update for [`update_approval_rule`]. `None` leaves a field untouched.
///
/// Has no `company_id`: a rule never moves between companies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApprovalRuleUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub auto_approve: Option<bool>,
    /// `Some(None)` clears the cap
    pub max_value: Option<Option<f64>>,
    pub conditions: Option<Vec<ApprovalCondition>>,
    pub approver_roles: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// Outcome of running a company's rules against a candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleDecision {
    /// An active auto-approving rule matched within its cap
    AutoApprove { rule_id: i64, rule_name: String },
    /// Rules matched but none may approve on its own; a human must review
    ManualReview { matched_rule_ids: Vec<i64> },
    /// No active rule matched
    NoMatch,
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("Approval rule name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn validate_max_value(max_value: Option<f64>) -> Result<Option<f64>> {
    match max_value {
        Some(amount) if !amount.is_finite() || amount < 0.0 => Err(Error::InvalidAmount { amount }),
        other => Ok(other),
    }
}

/// Creates a rule for `company_id`. The rule starts active.
#[instrument(skip(db, rule), fields(name = %rule.name))]
pub async fn create_approval_rule(
    db: &DatabaseConnection,
    company_id: &str,
    rule: NewApprovalRule,
) -> Result<approval_rule::Model> {
    let name = validate_name(&rule.name)?;
    let max_value = validate_max_value(rule.max_value)?;
    if company_id.trim().is_empty() {
        return Err(Error::validation("Company id cannot be empty"));
    }

    let now = chrono::Utc::now();
    let model = approval_rule::ActiveModel {
        company_id: Set(company_id.to_string()),
        name: Set(name),
        description: Set(rule.description),
        auto_approve: Set(rule.auto_approve),
        max_value: Set(max_value),
        conditions: Set(serde_json::to_string(&rule.conditions)?),
        approver_roles: Set(serde_json::to_string(&rule.approver_roles)?),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = model.insert(db).await?;
    info!(rule_id = created.id, "Created approval rule");
    Ok(created)
}

/// Retrieves a rule by id.
pub async fn get_approval_rule_by_id(
    db: &DatabaseConnection,
    rule_id: i64,
) -> Result<Option<approval_rule::Model>> {
    ApprovalRule::find_by_id(rule_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// All rules of a company, active or not, in creation order.
pub async fn get_approval_rules(
    db: &DatabaseConnection,
    company_id: &str,
) -> Result<Vec<approval_rule::Model>> {
    ApprovalRule::find()
        .filter(approval_rule::Column::CompanyId.eq(company_id))
        .order_by_asc(approval_rule::Column::CreatedAt)
        .order_by_asc(approval_rule::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Active rules of a company in creation order.
pub async fn get_active_approval_rules<C>(
    db: &C,
    company_id: &str,
) -> Result<Vec<approval_rule::Model>>
where
    C: ConnectionTrait,
{
    ApprovalRule::find()
        .filter(approval_rule::Column::CompanyId.eq(company_id))
        .filter(approval_rule::Column::IsActive.eq(true))
        .order_by_asc(approval_rule::Column::CreatedAt)
        .order_by_asc(approval_rule::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Merges `update` into an existing rule.
#[instrument(skip(db, update))]
pub async fn update_approval_rule(
    db: &DatabaseConnection,
    rule_id: i64,
    update: ApprovalRuleUpdate,
) -> Result<approval_rule::Model> {
    let name = update.name.as_deref().map(validate_name).transpose()?;
    let max_value = update.max_value.map(validate_max_value).transpose()?;

    let existing = ApprovalRule::find_by_id(rule_id)
        .one(db)
        .await?
        .ok_or(Error::RuleNotFound { id: rule_id })?;

    let mut model: approval_rule::ActiveModel = existing.into();
    if let Some(name) = name {
        model.name = Set(name);
    }
    if let Some(description) = update.description {
        model.description = Set(description);
    }
    if let Some(auto_approve) = update.auto_approve {
        model.auto_approve = Set(auto_approve);
    }
    if let Some(max_value) = max_value {
        model.max_value = Set(max_value);
    }
    if let Some(conditions) = update.conditions {
        model.conditions = Set(serde_json::to_string(&conditions)?);
    }
    if let Some(roles) = update.approver_roles {
        model.approver_roles = Set(serde_json::to_string(&roles)?);
    }
    if let Some(is_active) = update.is_active {
        model.is_active = Set(is_active);
    }
    model.updated_at = Set(chrono::Utc::now());

    let updated = model.update(db).await?;
    info!("Updated approval rule");
    Ok(updated)
}

/// Turns a rule on or off without touching anything else.
pub async fn set_approval_rule_active(
    db: &DatabaseConnection,
    rule_id: i64,
    is_active: bool,
) -> Result<approval_rule::Model> {
    update_approval_rule(
        db,
        rule_id,
        ApprovalRuleUpdate {
            is_active: Some(is_active),
            ..Default::default()
        },
    )
    .await
}

/// Permanently deletes a rule.
#[instrument(skip(db))]
pub async fn delete_approval_rule(db: &DatabaseConnection, rule_id: i64) -> Result<()> {
    let result = ApprovalRule::delete_by_id(rule_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::RuleNotFound { id: rule_id });
    }
    info!("Deleted approval rule");
    Ok(())
}

/// Whether `rule` may auto-approve `candidate` given its `max_value` cap. A capped rule
/// never approves a candidate without a numeric `value`.
#[must_use]
pub fn within_cap(rule: &approval_rule::Model, candidate: &Candidate) -> bool {
    rule.max_value.is_none_or(|max| {
        candidate
            .numeric_value()
            .is_some_and(|value| value <= max)
    })
}

/// Runs `rules` against `candidate` in order. Inactive rules are skipped. The first active
/// auto-approving rule that matches within its cap wins.
pub fn evaluate_rules(
    rules: &[approval_rule::Model],
    candidate: &Candidate,
) -> Result<RuleDecision> {
    let mut matched_rule_ids = Vec::new();

    for rule in rules.iter().filter(|rule| rule.is_active) {
        if !all_conditions_match(&rule.conditions()?, candidate) {
            continue;
        }
        if rule.auto_approve && within_cap(rule, candidate) {
            return Ok(RuleDecision::AutoApprove {
                rule_id: rule.id,
                rule_name: rule.name.clone(),
            });
        }
        matched_rule_ids.push(rule.id);
    }

    if matched_rule_ids.is_empty() {
        Ok(RuleDecision::NoMatch)
    } else {
        Ok(RuleDecision::ManualReview { matched_rule_ids })
    }
}
