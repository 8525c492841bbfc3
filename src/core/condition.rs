//! Condition evaluation for approval rules.
//!
//! A condition compares one field of a candidate request against a fixed value. Evaluation is
//! total: mismatched or missing operands make a condition false, they never produce an error.
//! A list of conditions is combined with logical AND.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Request fields a condition can inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionField {
    /// Monetary value of the request
    Value,
    /// Number of units requested
    Quantity,
    /// Product or spend category
    Category,
    /// Request priority label
    Priority,
}

impl ConditionField {
    /// Whether operands for this field are compared as numbers.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Value | Self::Quantity)
    }
}

impl fmt::Display for ConditionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Value => "value",
            Self::Quantity => "quantity",
            Self::Category => "category",
            Self::Priority => "priority",
        };
        f.write_str(name)
    }
}

/// Comparison applied between the candidate field and the condition value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionOperator {
    Gt,
    Lt,
    Eq,
    Contains,
}

/// A single `field operator value` test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalCondition {
    pub field: ConditionField,
    pub operator: ConditionOperator,
    pub value: Value,
}

impl ApprovalCondition {
    pub fn new(
        field: ConditionField,
        operator: ConditionOperator,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
        }
    }

    /// Evaluates this condition against a candidate. A missing field never matches.
    #[must_use]
    pub fn matches(&self, candidate: &Candidate) -> bool {
        candidate
            .get(self.field)
            .is_some_and(|actual| evaluate(self.field, self.operator, actual, &self.value))
    }
}

/// Field values of a request being checked against rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    fields: HashMap<ConditionField, Value>,
}

impl Candidate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    #[must_use]
    pub fn with(mut self, field: ConditionField, value: impl Into<Value>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    #[must_use]
    pub fn get(&self, field: ConditionField) -> Option<&Value> {
        self.fields.get(&field)
    }

    /// The candidate's `value` field as a number, if it has a numeric one.
    #[must_use]
    pub fn numeric_value(&self) -> Option<f64> {
        self.get(ConditionField::Value).and_then(as_number)
    }
}

/// True iff every condition matches. Stops at the first failing condition; an empty list
/// matches everything.
#[must_use]
pub fn all_conditions_match(conditions: &[ApprovalCondition], candidate: &Candidate) -> bool {
    conditions.iter().all(|condition| condition.matches(candidate))
}

fn evaluate(
    field: ConditionField,
    operator: ConditionOperator,
    actual: &Value,
    expected: &Value,
) -> bool {
    match operator {
        ConditionOperator::Gt => match (as_number(actual), as_number(expected)) {
            (Some(a), Some(e)) => a > e,
            _ => false,
        },
        ConditionOperator::Lt => match (as_number(actual), as_number(expected)) {
            (Some(a), Some(e)) => a < e,
            _ => false,
        },
        ConditionOperator::Eq if field.is_numeric() => {
            match (as_number(actual), as_number(expected)) {
                #[allow(clippy::float_cmp)]
                (Some(a), Some(e)) => a == e,
                _ => false,
            }
        }
        ConditionOperator::Eq => match (as_text(actual), as_text(expected)) {
            (Some(a), Some(e)) => a == e,
            _ => false,
        },
        ConditionOperator::Contains => match (as_text(actual), as_text(expected)) {
            (Some(a), Some(e)) => a.contains(e.as_str()),
            _ => false,
        },
    }
}

/// Numbers pass through; strings are parsed after trimming. NaN and infinities are rejected.
fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
