//! Movement model: a general-ledger entry, optionally derived from a payment.

use super::payment::MetodoPago;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Ledger entry type. `Deducible` entries are tracked for tax purposes and
/// excluded from the daily balance and movement count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TipoMovimiento {
    Ingreso,
    Egreso,
    Deducible,
}

impl TipoMovimiento {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingreso => "ingreso",
            Self::Egreso => "egreso",
            Self::Deducible => "deducible",
        }
    }
}

impl std::fmt::Display for TipoMovimiento {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Movement {
    pub id: Uuid,
    pub fecha: NaiveDate,
    pub tipo: TipoMovimiento,
    pub concepto: String,
    pub descripcion: Option<String>,
    pub monto: Decimal,
    pub id_inmueble: Uuid,
    pub id_reserva: Option<Uuid>,
    pub metodo_pago: Option<MetodoPago>,
    pub comprobante: Option<String>,
    pub id_empresa: Uuid,
    pub plataforma_origen: Option<String>,
    pub id_pago: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for recording a ledger movement.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub fecha: NaiveDate,
    pub tipo: TipoMovimiento,
    pub concepto: String,
    pub descripcion: Option<String>,
    pub monto: Decimal,
    pub id_inmueble: Uuid,
    pub id_reserva: Option<Uuid>,
    pub metodo_pago: Option<MetodoPago>,
    pub comprobante: Option<String>,
    pub id_empresa: Uuid,
    pub plataforma_origen: Option<String>,
    pub id_pago: Option<Uuid>,
}

/// Field-level partial update for a movement.
#[derive(Debug, Clone, Default)]
pub struct MovementChanges {
    pub fecha: Option<NaiveDate>,
    pub tipo: Option<TipoMovimiento>,
    pub concepto: Option<String>,
    pub descripcion: Option<Option<String>>,
    pub monto: Option<Decimal>,
    pub metodo_pago: Option<Option<MetodoPago>>,
    pub comprobante: Option<Option<String>>,
    pub plataforma_origen: Option<Option<String>>,
}

/// What was removed when deleting the movements tied to a payment.
#[derive(Debug, Clone, Serialize)]
pub struct DeletedMovements {
    pub count: u64,
    pub ids: Vec<Uuid>,
}

/// Tally for the reservation resync repair operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResyncOutcome {
    pub processed: usize,
    pub created: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Income/expense aggregation for one day.
///
/// Deducibles are summed separately and deliberately excluded from both
/// `balance` and `cantidad_movimientos`.
#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub fecha: NaiveDate,
    pub total_ingresos: Decimal,
    pub total_egresos: Decimal,
    pub total_deducibles: Decimal,
    pub balance: Decimal,
    pub cantidad_movimientos: usize,
}

/// Per-platform income totals. `cantidad_reservas` counts distinct
/// reservations, not movement rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlatformTotals {
    pub total_ingresos: Decimal,
    pub cantidad_reservas: usize,
}
