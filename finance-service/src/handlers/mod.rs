//! HTTP handlers for the finance API.

pub mod movements;
pub mod payments;
pub mod reconciliation;
pub mod reports;
