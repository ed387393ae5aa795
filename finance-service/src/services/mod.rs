pub mod database;
pub mod metrics;
pub mod payments;
pub mod reconciler;
pub mod reports;
pub mod store;
pub mod sync;
pub mod validator;

pub use database::Database;
pub use payments::PaymentService;
pub use reconciler::TotalsReconciler;
pub use reports::MovementLedger;
pub use sync::MovementSync;
