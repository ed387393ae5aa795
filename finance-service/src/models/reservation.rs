//! Finance view of a reservation.
//!
//! The reservation itself is owned by the booking subsystem; this service only
//! reads the fields it needs and writes back the cached totals.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// The slice of a reservation this service operates on.
///
/// `total_pagado` and `total_pendiente` are cached, recomputable values; the
/// source of truth is the sum of the reservation's payments.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReservationFinance {
    pub id: Uuid,
    pub codigo: String,
    pub total_reserva: Decimal,
    pub total_pagado: Decimal,
    pub total_pendiente: Decimal,
    pub id_inmueble: Option<Uuid>,
    pub id_empresa: Uuid,
    pub plataforma: Option<String>,
}

/// A reservation's cached money columns, as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReservationTotals {
    pub total_reserva: Decimal,
    pub total_pagado: Decimal,
    pub total_pendiente: Decimal,
}

/// Result of comparing stored totals against freshly recomputed ones.
#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyReport {
    pub id_reserva: Uuid,
    pub stored: ReservationTotals,
    pub computed: ReservationTotals,
    pub delta_pagado: Decimal,
    pub delta_pendiente: Decimal,
    pub is_consistent: bool,
}

/// Per-item tally for batch recomputation. One failing reservation does not
/// fail the batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}
