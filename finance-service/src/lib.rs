//! finance-service: payments, reservation totals, and the movement ledger.
//!
//! Payments are the source of truth for how much of a reservation is paid;
//! the reservation's totals are a recomputable cache and every payment
//! normally projects one income movement into the general ledger. This crate
//! keeps those three views consistent: it validates payments, recomputes
//! totals, derives and repairs movements, and serves the accounting reports
//! built on top of the ledger.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

pub use startup::{AppState, Application};
