//! Core business logic, independent of any delivery surface.
//!
//! Leaves first: [`condition`] evaluates rule conditions, [`approval_rule`] stores and runs
//! rules, [`budget`] is the budget lifecycle, [`ledger`] tracks team funding requests,
//! [`replication`] keeps the replication audit trail and [`report`] aggregates all of it.

pub mod approval_rule;
pub mod budget;
pub mod condition;
pub mod ledger;
pub mod replication;
pub mod report;
