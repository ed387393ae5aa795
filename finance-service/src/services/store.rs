//! Storage seams for the finance core.
//!
//! Every component receives these as injected `Arc<dyn …>` dependencies so the
//! orchestration logic can run against the Postgres implementation in
//! production and an in-memory fake in tests.

use crate::models::{
    Movement, MovementChanges, NewMovement, NewPayment, Payment, PaymentChanges, PaymentFilter,
    ReservationFinance,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use service_core::error::AppError;
use uuid::Uuid;

#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Fetch the finance view of a reservation, if it exists.
    async fn reservation_finance(&self, id: Uuid) -> Result<Option<ReservationFinance>, AppError>;

    /// Write back the cached totals. Returns false when the reservation does
    /// not exist.
    async fn update_totals(
        &self,
        id: Uuid,
        total_pagado: Decimal,
        total_pendiente: Decimal,
    ) -> Result<bool, AppError>;

    /// Ids of every reservation belonging to a company.
    async fn reservation_ids_by_company(&self, id_empresa: Uuid) -> Result<Vec<Uuid>, AppError>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert_payment(&self, input: &NewPayment) -> Result<Payment, AppError>;

    async fn payment(&self, id: Uuid) -> Result<Option<Payment>, AppError>;

    /// All payments of a reservation, oldest first.
    async fn payments_by_reservation(&self, id_reserva: Uuid) -> Result<Vec<Payment>, AppError>;

    /// Filtered page plus the total row count for the filter.
    async fn list_payments(
        &self,
        filter: &PaymentFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Payment>, i64), AppError>;

    /// Apply a partial update. Returns the updated row, or None when the
    /// payment does not exist.
    async fn update_payment(
        &self,
        id: Uuid,
        changes: &PaymentChanges,
    ) -> Result<Option<Payment>, AppError>;

    /// Hard delete. Returns false when the payment does not exist.
    async fn delete_payment(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait MovementStore: Send + Sync {
    async fn insert_movement(&self, input: &NewMovement) -> Result<Movement, AppError>;

    async fn movement(&self, id: Uuid) -> Result<Option<Movement>, AppError>;

    async fn update_movement(
        &self,
        id: Uuid,
        changes: &MovementChanges,
    ) -> Result<Option<Movement>, AppError>;

    async fn delete_movement(&self, id: Uuid) -> Result<bool, AppError>;

    /// Movements for one day, optionally narrowed to a company and platform.
    async fn movements_by_date(
        &self,
        fecha: NaiveDate,
        id_empresa: Option<Uuid>,
        plataforma: Option<&str>,
    ) -> Result<Vec<Movement>, AppError>;

    /// Movements of a property for one day.
    async fn movements_by_property(
        &self,
        id_inmueble: Uuid,
        fecha: NaiveDate,
    ) -> Result<Vec<Movement>, AppError>;

    /// Movements derived from a payment (`id_pago` back-reference).
    async fn movements_by_payment(&self, id_pago: Uuid) -> Result<Vec<Movement>, AppError>;

    /// Delete every movement referencing a payment; returns the removed ids.
    async fn delete_movements_by_payment(&self, id_pago: Uuid) -> Result<Vec<Uuid>, AppError>;

    /// `tipo=ingreso`, `concepto=reserva`, non-null platform rows in a date
    /// range, for the platform income report.
    async fn reservation_income_between(
        &self,
        desde: NaiveDate,
        hasta: NaiveDate,
        id_empresa: Uuid,
    ) -> Result<Vec<Movement>, AppError>;
}
