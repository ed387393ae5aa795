//! Totals reconciliation for reservations.
//!
//! The reservation's `total_pagado`/`total_pendiente` columns are a cache; the
//! payment rows are the source of truth. `recompute` is idempotent and safe to
//! re-run at any point, which is what makes the payment mutation sequence
//! recoverable when it is interrupted between steps.

use crate::models::{BatchOutcome, ConsistencyReport, ReservationTotals};
use crate::services::metrics::record_reconcile;
use crate::services::store::{PaymentStore, ReservationStore};
use crate::services::validator::pendiente;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Stored and recomputed totals are considered equal within one cent.
static TOLERANCE: Lazy<Decimal> = Lazy::new(|| Decimal::new(1, 2));

pub struct TotalsReconciler {
    reservations: Arc<dyn ReservationStore>,
    payments: Arc<dyn PaymentStore>,
}

impl TotalsReconciler {
    pub fn new(
        reservations: Arc<dyn ReservationStore>,
        payments: Arc<dyn PaymentStore>,
    ) -> Self {
        Self {
            reservations,
            payments,
        }
    }

    /// Recompute a reservation's paid/pending totals from its payments and
    /// write them back.
    #[instrument(skip(self))]
    pub async fn recompute(&self, id_reserva: Uuid) -> Result<ReservationTotals, AppError> {
        let reservation = self
            .reservations
            .reservation_finance(id_reserva)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Reservation {} not found", id_reserva))
            })?;

        let payments = self.payments.payments_by_reservation(id_reserva).await?;
        let total_pagado: Decimal = payments.iter().map(|p| p.monto).sum();
        let total_pendiente = pendiente(reservation.total_reserva, total_pagado);

        let updated = self
            .reservations
            .update_totals(id_reserva, total_pagado, total_pendiente)
            .await?;
        if !updated {
            record_reconcile("recompute", "error");
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Reservation {} disappeared during recompute",
                id_reserva
            )));
        }

        record_reconcile("recompute", "ok");
        tracing::info!(
            total_pagado = %total_pagado,
            total_pendiente = %total_pendiente,
            "Reservation totals recomputed"
        );

        Ok(ReservationTotals {
            total_reserva: reservation.total_reserva,
            total_pagado,
            total_pendiente,
        })
    }

    /// Compare stored totals against freshly recomputed ones without writing
    /// anything. Drift-detection tooling, not a hot-path call.
    #[instrument(skip(self))]
    pub async fn verify_consistency(
        &self,
        id_reserva: Uuid,
    ) -> Result<ConsistencyReport, AppError> {
        let reservation = self
            .reservations
            .reservation_finance(id_reserva)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Reservation {} not found", id_reserva))
            })?;

        let payments = self.payments.payments_by_reservation(id_reserva).await?;
        let total_pagado: Decimal = payments.iter().map(|p| p.monto).sum();
        let total_pendiente = pendiente(reservation.total_reserva, total_pagado);

        let stored = ReservationTotals {
            total_reserva: reservation.total_reserva,
            total_pagado: reservation.total_pagado,
            total_pendiente: reservation.total_pendiente,
        };
        let computed = ReservationTotals {
            total_reserva: reservation.total_reserva,
            total_pagado,
            total_pendiente,
        };

        let delta_pagado = stored.total_pagado - computed.total_pagado;
        let delta_pendiente = stored.total_pendiente - computed.total_pendiente;
        let is_consistent =
            delta_pagado.abs() < *TOLERANCE && delta_pendiente.abs() < *TOLERANCE;

        if !is_consistent {
            tracing::warn!(
                delta_pagado = %delta_pagado,
                delta_pendiente = %delta_pendiente,
                "Reservation totals drifted from payment rows"
            );
            record_reconcile("verify", "drift");
        }

        Ok(ConsistencyReport {
            id_reserva,
            stored,
            computed,
            delta_pagado,
            delta_pendiente,
            is_consistent,
        })
    }

    /// Recompute an explicit list of reservations, tallying per-item results
    /// instead of failing the batch on the first error.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn recompute_many(&self, ids: &[Uuid]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for &id in ids {
            outcome.processed += 1;
            match self.recompute(id).await {
                Ok(_) => outcome.succeeded += 1,
                Err(e) => {
                    outcome.failed += 1;
                    outcome.errors.push(format!("reserva {id}: {e}"));
                }
            }
        }
        outcome
    }

    /// Recompute every reservation belonging to a company.
    #[instrument(skip(self))]
    pub async fn recompute_company(&self, id_empresa: Uuid) -> Result<BatchOutcome, AppError> {
        let ids = self
            .reservations
            .reservation_ids_by_company(id_empresa)
            .await?;
        Ok(self.recompute_many(&ids).await)
    }
}
