//! Payment operations: validation, persistence, and downstream triggers.
//!
//! A payment mutation succeeds or fails on the validator and the payment write
//! alone. The follow-up steps (totals recompute, movement derive/remove) are
//! best-effort: their failures are logged and reported through response flags,
//! never as a failure of the payment operation itself. The compensation for a
//! sequence interrupted mid-way is the idempotent recompute plus the resync
//! repair path.

use crate::middleware::AuthContext;
use crate::models::{
    NewPayment, Payment, PaymentChanges, PaymentFilter, PaymentSummary,
};
use crate::services::metrics::record_payment_operation;
use crate::services::reconciler::TotalsReconciler;
use crate::services::store::{PaymentStore, ReservationStore};
use crate::services::sync::MovementSync;
use crate::services::validator::{build_summary, validate_monto};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{instrument, warn};
use uuid::Uuid;

const MAX_PAGE_SIZE: i64 = 100;
const DEFAULT_PAGE_SIZE: i64 = 20;

/// Clamp a requested page size to the allowed range. Zero or negative means
/// "use the default".
pub fn effective_page_size(limit: i64) -> i64 {
    if limit <= 0 {
        DEFAULT_PAGE_SIZE
    } else {
        limit.min(MAX_PAGE_SIZE)
    }
}

/// Result of creating a payment. The sync flags tell the caller whether the
/// downstream steps ran, without failing the creation when they did not.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedPayment {
    pub pago: Payment,
    pub movimiento_creado: bool,
    pub movimiento_id: Option<Uuid>,
    pub totales_recalculados: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdatedPayment {
    pub pago: Payment,
    pub totales_recalculados: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedPayment {
    pub id: Uuid,
    pub movimientos_eliminados: u64,
    pub movimiento_ids: Vec<Uuid>,
    pub totales_recalculados: bool,
}

pub struct PaymentService {
    reservations: Arc<dyn ReservationStore>,
    payments: Arc<dyn PaymentStore>,
    reconciler: Arc<TotalsReconciler>,
    sync: Arc<MovementSync>,
    // Serializes validate+write per reservation so two concurrent payments
    // cannot both pass validation against the same pre-update paid total.
    reservation_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl PaymentService {
    pub fn new(
        reservations: Arc<dyn ReservationStore>,
        payments: Arc<dyn PaymentStore>,
        reconciler: Arc<TotalsReconciler>,
        sync: Arc<MovementSync>,
    ) -> Self {
        Self {
            reservations,
            payments,
            reconciler,
            sync,
            reservation_locks: DashMap::new(),
        }
    }

    fn reservation_lock(&self, id_reserva: Uuid) -> Arc<Mutex<()>> {
        self.reservation_locks
            .entry(id_reserva)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry once no mutation holds a reference to it, so the
    /// table stays proportional to in-flight mutations rather than to every
    /// reservation ever touched.
    fn release_reservation_lock(&self, id_reserva: Uuid) {
        self.reservation_locks
            .remove_if(&id_reserva, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of reservations with a live mutation lock entry.
    pub fn active_reservation_locks(&self) -> usize {
        self.reservation_locks.len()
    }

    /// Recompute totals after a payment mutation. Failures degrade to a
    /// warning plus a response flag; the totals stay stale until the next
    /// recompute or consistency check.
    async fn recompute_after_mutation(&self, id_reserva: Uuid) -> bool {
        match self.reconciler.recompute(id_reserva).await {
            Ok(_) => true,
            Err(e) => {
                warn!(id_reserva = %id_reserva, error = %e, "Totals recompute failed after payment mutation");
                false
            }
        }
    }

    #[instrument(skip(self, ctx, input), fields(id_reserva = %input.id_reserva, monto = %input.monto))]
    pub async fn create_payment(
        &self,
        ctx: &AuthContext,
        input: NewPayment,
    ) -> Result<CreatedPayment, AppError> {
        let id_reserva = input.id_reserva;
        let lock = self.reservation_lock(id_reserva);
        let guard = lock.lock().await;
        let result = self.create_payment_locked(ctx, input).await;
        drop(guard);
        drop(lock);
        self.release_reservation_lock(id_reserva);
        result
    }

    async fn create_payment_locked(
        &self,
        ctx: &AuthContext,
        mut input: NewPayment,
    ) -> Result<CreatedPayment, AppError> {
        let reservation = self
            .reservations
            .reservation_finance(input.id_reserva)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "Reservation {} not found",
                    input.id_reserva
                ))
            })?;

        if !ctx.can_access_company(reservation.id_empresa) {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Reservation belongs to another company"
            )));
        }

        // Ledger rows always carry the reservation's company, whatever the
        // caller sent.
        input.id_empresa = reservation.id_empresa;
        input.id_usuario_registro = Some(ctx.user_id);

        // Source of truth for the paid total is the payment rows, not the
        // cached reservation columns.
        let existing = self
            .payments
            .payments_by_reservation(input.id_reserva)
            .await?;
        let total_pagado: Decimal = existing.iter().map(|p| p.monto).sum();

        let validation = validate_monto(input.monto, reservation.total_reserva, total_pagado);
        if !validation.valid {
            record_payment_operation("create", "rejected");
            return Err(AppError::Validation(validation.errors));
        }

        let payment = self.payments.insert_payment(&input).await?;
        record_payment_operation("create", "ok");
        tracing::info!(id_pago = %payment.id, "Payment registered");

        let totales_recalculados = self.recompute_after_mutation(payment.id_reserva).await;

        let (movimiento_creado, movimiento_id) = match self.sync.derive_movement(&payment).await {
            Ok(Some(movement)) => (true, Some(movement.id)),
            Ok(None) => (false, None),
            Err(e) => {
                warn!(id_pago = %payment.id, error = %e, "Movement derivation failed, payment kept");
                (false, None)
            }
        };

        Ok(CreatedPayment {
            pago: payment,
            movimiento_creado,
            movimiento_id,
            totales_recalculados,
            warnings: validation.warnings,
        })
    }

    #[instrument(skip(self, ctx, changes))]
    pub async fn update_payment(
        &self,
        ctx: &AuthContext,
        id: Uuid,
        changes: PaymentChanges,
    ) -> Result<UpdatedPayment, AppError> {
        let current = self
            .payments
            .payment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment {} not found", id)))?;

        if !ctx.can_access_company(current.id_empresa) {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Payment belongs to another company"
            )));
        }

        let id_reserva = current.id_reserva;
        let lock = self.reservation_lock(id_reserva);
        let guard = lock.lock().await;
        let result = self.update_payment_locked(id, changes, &current).await;
        drop(guard);
        drop(lock);
        self.release_reservation_lock(id_reserva);
        result
    }

    async fn update_payment_locked(
        &self,
        id: Uuid,
        changes: PaymentChanges,
        current: &Payment,
    ) -> Result<UpdatedPayment, AppError> {
        let mut warnings = Vec::new();
        if let Some(nuevo_monto) = changes.monto {
            if nuevo_monto != current.monto {
                let reservation = self
                    .reservations
                    .reservation_finance(current.id_reserva)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(anyhow::anyhow!(
                            "Reservation {} not found",
                            current.id_reserva
                        ))
                    })?;

                // Validate against the sum of the *other* payments so this
                // payment's current amount does not count against itself.
                let others: Decimal = self
                    .payments
                    .payments_by_reservation(current.id_reserva)
                    .await?
                    .iter()
                    .filter(|p| p.id != id)
                    .map(|p| p.monto)
                    .sum();

                let validation = validate_monto(nuevo_monto, reservation.total_reserva, others);
                if !validation.valid {
                    record_payment_operation("update", "rejected");
                    return Err(AppError::Validation(validation.errors));
                }
                warnings = validation.warnings;
            }
        }

        let updated = self
            .payments
            .update_payment(id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment {} not found", id)))?;
        record_payment_operation("update", "ok");

        let totales_recalculados = self.recompute_after_mutation(updated.id_reserva).await;

        Ok(UpdatedPayment {
            pago: updated,
            totales_recalculados,
            warnings,
        })
    }

    /// Delete a payment. Associated movements are removed first; a failure
    /// there is logged and reported in the counts but does not keep the
    /// payment alive.
    #[instrument(skip(self, ctx))]
    pub async fn delete_payment(
        &self,
        ctx: &AuthContext,
        id: Uuid,
    ) -> Result<DeletedPayment, AppError> {
        let payment = self
            .payments
            .payment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment {} not found", id)))?;

        if !ctx.can_access_company(payment.id_empresa) {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Payment belongs to another company"
            )));
        }

        let id_reserva = payment.id_reserva;
        let lock = self.reservation_lock(id_reserva);
        let guard = lock.lock().await;
        let result = self.delete_payment_locked(id, &payment).await;
        drop(guard);
        drop(lock);
        self.release_reservation_lock(id_reserva);
        result
    }

    async fn delete_payment_locked(
        &self,
        id: Uuid,
        payment: &Payment,
    ) -> Result<DeletedPayment, AppError> {
        let removed = match self.sync.delete_associated_movements(id).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(id_pago = %id, error = %e, "Failed to remove associated movements, deleting payment anyway");
                crate::models::DeletedMovements {
                    count: 0,
                    ids: Vec::new(),
                }
            }
        };

        let deleted = self.payments.delete_payment(id).await?;
        if !deleted {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Payment {} not found",
                id
            )));
        }
        record_payment_operation("delete", "ok");
        tracing::info!(id_pago = %id, movimientos_eliminados = removed.count, "Payment deleted");

        let totales_recalculados = self.recompute_after_mutation(payment.id_reserva).await;

        Ok(DeletedPayment {
            id,
            movimientos_eliminados: removed.count,
            movimiento_ids: removed.ids,
            totales_recalculados,
        })
    }

    pub async fn payment(&self, ctx: &AuthContext, id: Uuid) -> Result<Payment, AppError> {
        let payment = self
            .payments
            .payment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment {} not found", id)))?;
        if !ctx.can_access_company(payment.id_empresa) {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Payment belongs to another company"
            )));
        }
        Ok(payment)
    }

    /// Payments of a reservation plus the on-demand summary read-model.
    pub async fn payments_with_summary(
        &self,
        ctx: &AuthContext,
        id_reserva: Uuid,
    ) -> Result<(Vec<Payment>, PaymentSummary), AppError> {
        let reservation = self
            .reservations
            .reservation_finance(id_reserva)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Reservation {} not found", id_reserva))
            })?;

        if !ctx.can_access_company(reservation.id_empresa) {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Reservation belongs to another company"
            )));
        }

        let payments = self.payments.payments_by_reservation(id_reserva).await?;
        let summary = build_summary(&reservation, &payments);
        Ok((payments, summary))
    }

    /// Filtered, paginated listing. Non-superadmin callers are pinned to
    /// their own company.
    pub async fn list_payments(
        &self,
        ctx: &AuthContext,
        mut filter: PaymentFilter,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Payment>, i64), AppError> {
        if !ctx.is_superadmin() {
            filter.id_empresa = Some(ctx.company_id);
        }

        let limit = effective_page_size(limit);
        let page = page.max(1);
        let offset = (page - 1) * limit;

        self.payments.list_payments(&filter, limit, offset).await
    }
}
