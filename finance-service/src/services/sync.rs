//! Payment↔movement synchronization.
//!
//! A payment normally produces exactly one `ingreso` ledger movement, but the
//! link is deliberately loose: derivation can fail (or resolve to nothing)
//! without invalidating the payment, and `resync_reservation` is the repair
//! path that backfills missing movements later.

use crate::models::{
    ConceptoPago, DeletedMovements, Movement, NewMovement, Payment, ResyncOutcome, TipoMovimiento,
};
use crate::services::metrics::record_movement_sync;
use crate::services::store::{MovementStore, PaymentStore, ReservationStore};
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Ledger concept a payment concept maps to. Static business knowledge;
/// anything unlisted lands on `reserva`.
pub fn concepto_movimiento(concepto: ConceptoPago) -> &'static str {
    match concepto {
        ConceptoPago::AbonoInicial => "reserva",
        ConceptoPago::SegundoAbono => "reserva",
        ConceptoPago::PagoFinal => "reserva",
        ConceptoPago::LimpiezaExtra => "limpieza",
        ConceptoPago::Garantia => "garantia",
        _ => "reserva",
    }
}

/// Human-readable ledger description for a derived movement.
fn build_descripcion(codigo_reserva: &str, payment: &Payment) -> String {
    let mut descripcion = format!("Pago reserva {} ({})", codigo_reserva, payment.concepto);
    if let Some(texto) = payment.descripcion.as_deref().filter(|t| !t.is_empty()) {
        descripcion.push_str(" - ");
        descripcion.push_str(texto);
    }
    if let Some(comprobante) = payment.comprobante.as_deref().filter(|c| !c.is_empty()) {
        descripcion.push_str(&format!(" [comprobante: {comprobante}]"));
    }
    descripcion
}

pub struct MovementSync {
    reservations: Arc<dyn ReservationStore>,
    payments: Arc<dyn PaymentStore>,
    movements: Arc<dyn MovementStore>,
}

impl MovementSync {
    pub fn new(
        reservations: Arc<dyn ReservationStore>,
        payments: Arc<dyn PaymentStore>,
        movements: Arc<dyn MovementStore>,
    ) -> Self {
        Self {
            reservations,
            payments,
            movements,
        }
    }

    /// Derive the ledger movement for a payment.
    ///
    /// Returns `Ok(None)` when the inputs cannot be resolved (reservation gone,
    /// property unknown): the payment stays valid and no movement is created.
    /// Store failures propagate; callers on the payment path swallow them.
    #[instrument(skip(self, payment), fields(id_pago = %payment.id, id_reserva = %payment.id_reserva))]
    pub async fn derive_movement(&self, payment: &Payment) -> Result<Option<Movement>, AppError> {
        let reservation = match self.reservations.reservation_finance(payment.id_reserva).await? {
            Some(r) => r,
            None => {
                warn!("Reservation not found, skipping movement derivation");
                record_movement_sync("derive", "skipped");
                return Ok(None);
            }
        };

        let id_inmueble = match reservation.id_inmueble {
            Some(id) => id,
            None => {
                warn!(
                    codigo = %reservation.codigo,
                    "Reservation has no property, skipping movement derivation"
                );
                record_movement_sync("derive", "skipped");
                return Ok(None);
            }
        };

        let concepto = concepto_movimiento(payment.concepto);
        // The originating platform only makes sense on reservation income.
        let plataforma_origen = if concepto == "reserva" {
            reservation.plataforma.clone()
        } else {
            None
        };

        let input = NewMovement {
            fecha: payment.fecha_pago,
            tipo: TipoMovimiento::Ingreso,
            concepto: concepto.to_string(),
            descripcion: Some(build_descripcion(&reservation.codigo, payment)),
            monto: payment.monto,
            id_inmueble,
            id_reserva: Some(payment.id_reserva),
            metodo_pago: Some(payment.metodo_pago),
            comprobante: payment.comprobante.clone(),
            id_empresa: payment.id_empresa,
            plataforma_origen,
            id_pago: Some(payment.id),
        };

        let movement = self.movements.insert_movement(&input).await.map_err(|e| {
            record_movement_sync("derive", "error");
            e
        })?;

        record_movement_sync("derive", "ok");
        tracing::info!(id_movimiento = %movement.id, concepto = %movement.concepto, "Movement derived from payment");
        Ok(Some(movement))
    }

    /// Movements carrying the payment's back-reference.
    pub async fn associated_movements(&self, id_pago: Uuid) -> Result<Vec<Movement>, AppError> {
        self.movements.movements_by_payment(id_pago).await
    }

    /// Remove every movement derived from a payment. Returns what was removed
    /// for audit purposes, whether or not the caller goes on to delete the
    /// payment itself.
    #[instrument(skip(self))]
    pub async fn delete_associated_movements(
        &self,
        id_pago: Uuid,
    ) -> Result<DeletedMovements, AppError> {
        let ids = self.movements.delete_movements_by_payment(id_pago).await?;
        record_movement_sync("delete", "ok");
        Ok(DeletedMovements {
            count: ids.len() as u64,
            ids,
        })
    }

    /// Backfill missing movements for every payment of a reservation.
    #[instrument(skip(self))]
    pub async fn resync_reservation(&self, id_reserva: Uuid) -> Result<ResyncOutcome, AppError> {
        let payments = self.payments.payments_by_reservation(id_reserva).await?;
        let mut outcome = ResyncOutcome::default();

        for payment in &payments {
            outcome.processed += 1;

            let existing = self.movements.movements_by_payment(payment.id).await?;
            if !existing.is_empty() {
                continue;
            }

            match self.derive_movement(payment).await {
                Ok(Some(_)) => outcome.created += 1,
                Ok(None) => {
                    outcome.failed += 1;
                    outcome
                        .errors
                        .push(format!("pago {}: no se pudo resolver el movimiento", payment.id));
                }
                Err(e) => {
                    outcome.failed += 1;
                    outcome.errors.push(format!("pago {}: {e}", payment.id));
                }
            }
        }

        tracing::info!(
            processed = outcome.processed,
            created = outcome.created,
            failed = outcome.failed,
            "Reservation movements resynced"
        );
        Ok(outcome)
    }
}
