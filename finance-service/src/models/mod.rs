//! Domain models for finance-service.

pub mod movement;
pub mod payment;
pub mod reservation;

pub use movement::{
    DailySummary, DeletedMovements, Movement, MovementChanges, NewMovement, PlatformTotals,
    ResyncOutcome, TipoMovimiento,
};
pub use payment::{
    ConceptoPago, EstadoPago, LastPayment, MetodoPago, NewPayment, Payment, PaymentChanges,
    PaymentFilter, PaymentSummary,
};
pub use reservation::{BatchOutcome, ConsistencyReport, ReservationFinance, ReservationTotals};
