//! Prometheus metrics for finance-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

/// Histogram for database query duration by operation.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "finance_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Counter for payment mutations by operation and status.
pub static PAYMENT_OPERATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_payment_operations_total",
        "Total number of payment operations",
        &["operation", "status"]
    )
    .expect("Failed to register PAYMENT_OPERATIONS")
});

/// Counter for payment-to-movement sync operations.
pub static MOVEMENT_SYNC: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_movement_sync_total",
        "Total number of payment-movement sync operations",
        &["operation", "status"]
    )
    .expect("Failed to register MOVEMENT_SYNC")
});

/// Counter for totals reconciliation operations.
pub static RECONCILE_OPERATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_reconcile_operations_total",
        "Total number of totals reconciliation operations",
        &["operation", "status"]
    )
    .expect("Failed to register RECONCILE_OPERATIONS")
});

/// Counter for errors by type.
pub static ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finance_errors_total",
        "Total number of errors",
        &["error_type"]
    )
    .expect("Failed to register ERRORS")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&PAYMENT_OPERATIONS);
    Lazy::force(&MOVEMENT_SYNC);
    Lazy::force(&RECONCILE_OPERATIONS);
    Lazy::force(&ERRORS);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record a payment operation.
pub fn record_payment_operation(operation: &str, status: &str) {
    PAYMENT_OPERATIONS
        .with_label_values(&[operation, status])
        .inc();
}

/// Record a movement sync operation.
pub fn record_movement_sync(operation: &str, status: &str) {
    MOVEMENT_SYNC.with_label_values(&[operation, status]).inc();
}

/// Record a reconciliation operation.
pub fn record_reconcile(operation: &str, status: &str) {
    RECONCILE_OPERATIONS
        .with_label_values(&[operation, status])
        .inc();
}

/// Record an error.
pub fn record_error(error_type: &str) {
    ERRORS.with_label_values(&[error_type]).inc();
}
