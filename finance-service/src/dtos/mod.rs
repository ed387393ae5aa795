//! Request and response shapes for the HTTP API.

use crate::models::{
    ConceptoPago, MetodoPago, MovementChanges, NewMovement, NewPayment, Payment, PaymentChanges,
    PaymentSummary, TipoMovimiento,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub id_reserva: Uuid,
    pub monto: Decimal,
    pub fecha_pago: NaiveDate,
    pub metodo_pago: MetodoPago,
    pub concepto: ConceptoPago,
    pub descripcion: Option<String>,
    pub comprobante: Option<String>,
}

impl CreatePaymentRequest {
    /// Company and registering user come from the caller context; the service
    /// overrides the company with the reservation's own.
    pub fn into_new_payment(self, id_empresa: Uuid) -> NewPayment {
        NewPayment {
            id_reserva: self.id_reserva,
            monto: self.monto,
            fecha_pago: self.fecha_pago,
            metodo_pago: self.metodo_pago,
            concepto: self.concepto,
            descripcion: self.descripcion,
            comprobante: self.comprobante,
            id_empresa,
            id_usuario_registro: None,
        }
    }
}

/// Partial update. Absent fields are left untouched; `descripcion` and
/// `comprobante` cannot be cleared through this endpoint, only replaced.
#[derive(Debug, Deserialize, Default)]
pub struct UpdatePaymentRequest {
    pub monto: Option<Decimal>,
    pub fecha_pago: Option<NaiveDate>,
    pub metodo_pago: Option<MetodoPago>,
    pub concepto: Option<ConceptoPago>,
    pub descripcion: Option<String>,
    pub comprobante: Option<String>,
}

impl From<UpdatePaymentRequest> for PaymentChanges {
    fn from(req: UpdatePaymentRequest) -> Self {
        PaymentChanges {
            monto: req.monto,
            fecha_pago: req.fecha_pago,
            metodo_pago: req.metodo_pago,
            concepto: req.concepto,
            descripcion: req.descripcion.map(Some),
            comprobante: req.comprobante.map(Some),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct PaymentListQuery {
    pub id_reserva: Option<Uuid>,
    pub desde: Option<NaiveDate>,
    pub hasta: Option<NaiveDate>,
    pub metodo_pago: Option<MetodoPago>,
    pub id_empresa: Option<Uuid>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct PaymentsWithSummaryResponse {
    pub pagos: Vec<Payment>,
    pub resumen: PaymentSummary,
}

#[derive(Debug, Deserialize)]
pub struct CreateMovementRequest {
    pub fecha: NaiveDate,
    pub tipo: TipoMovimiento,
    pub concepto: String,
    pub descripcion: Option<String>,
    pub monto: Decimal,
    pub id_inmueble: Uuid,
    pub id_reserva: Option<Uuid>,
    pub metodo_pago: Option<MetodoPago>,
    pub comprobante: Option<String>,
    pub id_empresa: Option<Uuid>,
    pub plataforma_origen: Option<String>,
    pub id_pago: Option<Uuid>,
}

impl CreateMovementRequest {
    /// `id_empresa` from the body only matters for superadmins; everyone else
    /// is pinned to their own company downstream.
    pub fn into_new_movement(self, fallback_empresa: Uuid) -> NewMovement {
        NewMovement {
            fecha: self.fecha,
            tipo: self.tipo,
            concepto: self.concepto,
            descripcion: self.descripcion,
            monto: self.monto,
            id_inmueble: self.id_inmueble,
            id_reserva: self.id_reserva,
            metodo_pago: self.metodo_pago,
            comprobante: self.comprobante,
            id_empresa: self.id_empresa.unwrap_or(fallback_empresa),
            plataforma_origen: self.plataforma_origen,
            id_pago: self.id_pago,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateMovementRequest {
    pub fecha: Option<NaiveDate>,
    pub tipo: Option<TipoMovimiento>,
    pub concepto: Option<String>,
    pub descripcion: Option<String>,
    pub monto: Option<Decimal>,
    pub metodo_pago: Option<MetodoPago>,
    pub comprobante: Option<String>,
    pub plataforma_origen: Option<String>,
}

impl From<UpdateMovementRequest> for MovementChanges {
    fn from(req: UpdateMovementRequest) -> Self {
        MovementChanges {
            fecha: req.fecha,
            tipo: req.tipo,
            concepto: req.concepto,
            descripcion: req.descripcion.map(Some),
            monto: req.monto,
            metodo_pago: req.metodo_pago.map(Some),
            comprobante: req.comprobante.map(Some),
            plataforma_origen: req.plataforma_origen.map(Some),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MovementsByDateQuery {
    pub fecha: NaiveDate,
    pub plataforma: Option<String>,
    pub id_empresa: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct MovementsByPropertyQuery {
    pub fecha: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct DailySummaryQuery {
    pub fecha: NaiveDate,
    pub id_empresa: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct PlatformReportQuery {
    pub desde: NaiveDate,
    pub hasta: NaiveDate,
    pub id_empresa: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct RecomputeManyRequest {
    pub ids: Vec<Uuid>,
}
