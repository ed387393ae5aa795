//! Payment model: a discrete amount paid against a reservation.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// How a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MetodoPago {
    Efectivo,
    Transferencia,
    Tarjeta,
    Otro,
}

impl MetodoPago {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Efectivo => "efectivo",
            Self::Transferencia => "transferencia",
            Self::Tarjeta => "tarjeta",
            Self::Otro => "otro",
        }
    }
}

impl std::fmt::Display for MetodoPago {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Business meaning of a payment. Drives the derived ledger concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConceptoPago {
    AbonoInicial,
    SegundoAbono,
    PagoFinal,
    LimpiezaExtra,
    Garantia,
    Otro,
}

impl ConceptoPago {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AbonoInicial => "abono_inicial",
            Self::SegundoAbono => "segundo_abono",
            Self::PagoFinal => "pago_final",
            Self::LimpiezaExtra => "limpieza_extra",
            Self::Garantia => "garantia",
            Self::Otro => "otro",
        }
    }
}

impl std::fmt::Display for ConceptoPago {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment state of a reservation, derived from its totals.
///
/// `Excedido` should be unreachable while the validator holds, but totals are
/// a cached value and can drift, so the state stays representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoPago {
    SinPagos,
    Parcial,
    Completo,
    Excedido,
}

impl EstadoPago {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SinPagos => "sin_pagos",
            Self::Parcial => "parcial",
            Self::Completo => "completo",
            Self::Excedido => "excedido",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub id_reserva: Uuid,
    pub monto: Decimal,
    pub fecha_pago: NaiveDate,
    pub metodo_pago: MetodoPago,
    pub concepto: ConceptoPago,
    pub descripcion: Option<String>,
    pub comprobante: Option<String>,
    pub id_empresa: Uuid,
    pub id_usuario_registro: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a payment. `id_reserva` is immutable after creation.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub id_reserva: Uuid,
    pub monto: Decimal,
    pub fecha_pago: NaiveDate,
    pub metodo_pago: MetodoPago,
    pub concepto: ConceptoPago,
    pub descripcion: Option<String>,
    pub comprobante: Option<String>,
    pub id_empresa: Uuid,
    pub id_usuario_registro: Option<Uuid>,
}

/// Field-level partial update for a payment. `None` leaves the field as is.
#[derive(Debug, Clone, Default)]
pub struct PaymentChanges {
    pub monto: Option<Decimal>,
    pub fecha_pago: Option<NaiveDate>,
    pub metodo_pago: Option<MetodoPago>,
    pub concepto: Option<ConceptoPago>,
    pub descripcion: Option<Option<String>>,
    pub comprobante: Option<Option<String>>,
}

/// Filters for the paginated payment listing.
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub id_reserva: Option<Uuid>,
    pub desde: Option<NaiveDate>,
    pub hasta: Option<NaiveDate>,
    pub metodo_pago: Option<MetodoPago>,
    pub id_empresa: Option<Uuid>,
}

/// Most recent payment of a reservation, shown in the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastPayment {
    pub fecha_pago: NaiveDate,
    pub monto: Decimal,
    pub metodo_pago: MetodoPago,
}

/// Read-model computed on demand from a reservation and its payments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub total_reserva: Decimal,
    pub total_pagado: Decimal,
    pub total_pendiente: Decimal,
    pub cantidad_pagos: usize,
    pub porcentaje_pagado: Decimal,
    pub estado_pago: EstadoPago,
    pub ultimo_pago: Option<LastPayment>,
}
