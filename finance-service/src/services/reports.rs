//! Movement ledger operations and accounting reports.

use crate::middleware::AuthContext;
use crate::models::{
    DailySummary, Movement, MovementChanges, NewMovement, PlatformTotals, TipoMovimiento,
};
use crate::services::store::{MovementStore, PaymentStore};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Ledger concept for reservation income; the only concept that may carry an
/// originating platform.
pub const CONCEPTO_RESERVA: &str = "reserva";

/// Field-level invariants for a movement, checked on create and update.
fn validate_movement(
    tipo: TipoMovimiento,
    concepto: &str,
    monto: Decimal,
    metodo_pago: Option<&crate::models::MetodoPago>,
    plataforma_origen: Option<&str>,
) -> Vec<String> {
    let mut errors = Vec::new();

    if monto <= Decimal::ZERO {
        errors.push("El monto del movimiento debe ser mayor a 0".to_string());
    }

    if plataforma_origen.is_some()
        && !(tipo == TipoMovimiento::Ingreso && concepto == CONCEPTO_RESERVA)
    {
        errors.push(
            "plataforma_origen solo aplica a movimientos de ingreso con concepto reserva"
                .to_string(),
        );
    }

    if tipo == TipoMovimiento::Deducible && metodo_pago.is_some() {
        errors.push("Los movimientos deducibles no llevan metodo_pago".to_string());
    }

    errors
}

/// Fold one day of movements into the daily summary.
///
/// Deducibles are summed on their own and excluded from both the balance and
/// the movement count.
pub fn fold_daily(fecha: NaiveDate, movements: &[Movement]) -> DailySummary {
    let mut total_ingresos = Decimal::ZERO;
    let mut total_egresos = Decimal::ZERO;
    let mut total_deducibles = Decimal::ZERO;
    let mut cantidad_movimientos = 0usize;

    for m in movements {
        match m.tipo {
            TipoMovimiento::Ingreso => {
                total_ingresos += m.monto;
                cantidad_movimientos += 1;
            }
            TipoMovimiento::Egreso => {
                total_egresos += m.monto;
                cantidad_movimientos += 1;
            }
            TipoMovimiento::Deducible => {
                total_deducibles += m.monto;
            }
        }
    }

    DailySummary {
        fecha,
        balance: total_ingresos - total_egresos,
        total_ingresos,
        total_egresos,
        total_deducibles,
        cantidad_movimientos,
    }
}

/// Group reservation-income movements by originating platform.
///
/// `cantidad_reservas` counts distinct reservations, not movement rows.
pub fn group_by_platform(movements: &[Movement]) -> BTreeMap<String, PlatformTotals> {
    let mut totals: BTreeMap<String, (Decimal, HashSet<Uuid>)> = BTreeMap::new();

    for m in movements {
        let Some(plataforma) = m.plataforma_origen.as_deref() else {
            continue;
        };
        let entry = totals
            .entry(plataforma.to_string())
            .or_insert_with(|| (Decimal::ZERO, HashSet::new()));
        entry.0 += m.monto;
        if let Some(id_reserva) = m.id_reserva {
            entry.1.insert(id_reserva);
        }
    }

    totals
        .into_iter()
        .map(|(plataforma, (total_ingresos, reservas))| {
            (
                plataforma,
                PlatformTotals {
                    total_ingresos,
                    cantidad_reservas: reservas.len(),
                },
            )
        })
        .collect()
}

pub struct MovementLedger {
    movements: Arc<dyn MovementStore>,
    payments: Arc<dyn PaymentStore>,
}

impl MovementLedger {
    pub fn new(movements: Arc<dyn MovementStore>, payments: Arc<dyn PaymentStore>) -> Self {
        Self { movements, payments }
    }

    #[instrument(skip(self, ctx, input), fields(tipo = %input.tipo, concepto = %input.concepto))]
    pub async fn create_movement(
        &self,
        ctx: &AuthContext,
        mut input: NewMovement,
    ) -> Result<Movement, AppError> {
        if !ctx.is_superadmin() {
            input.id_empresa = ctx.company_id;
        }

        let errors = validate_movement(
            input.tipo,
            &input.concepto,
            input.monto,
            input.metodo_pago.as_ref(),
            input.plataforma_origen.as_deref(),
        );
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        // A back-reference must point at a real payment.
        if let Some(id_pago) = input.id_pago {
            if self.payments.payment(id_pago).await?.is_none() {
                return Err(AppError::Validation(vec![format!(
                    "id_pago {id_pago} no corresponde a un pago existente"
                )]));
            }
        }

        let movement = self.movements.insert_movement(&input).await?;
        tracing::info!(id_movimiento = %movement.id, "Movement recorded");
        Ok(movement)
    }

    #[instrument(skip(self, ctx, changes))]
    pub async fn update_movement(
        &self,
        ctx: &AuthContext,
        id: Uuid,
        changes: MovementChanges,
    ) -> Result<Movement, AppError> {
        let current = self
            .movements
            .movement(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Movement {} not found", id)))?;

        if !ctx.can_access_company(current.id_empresa) {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Movement belongs to another company"
            )));
        }

        // Validate the row as it would look after the partial update.
        let tipo = changes.tipo.unwrap_or(current.tipo);
        let concepto = changes.concepto.clone().unwrap_or(current.concepto.clone());
        let monto = changes.monto.unwrap_or(current.monto);
        let metodo_pago = changes
            .metodo_pago
            .clone()
            .unwrap_or(current.metodo_pago);
        let plataforma_origen = changes
            .plataforma_origen
            .clone()
            .unwrap_or(current.plataforma_origen.clone());

        let errors = validate_movement(
            tipo,
            &concepto,
            monto,
            metodo_pago.as_ref(),
            plataforma_origen.as_deref(),
        );
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        self.movements
            .update_movement(id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Movement {} not found", id)))
    }

    pub async fn movement(&self, ctx: &AuthContext, id: Uuid) -> Result<Movement, AppError> {
        let movement = self
            .movements
            .movement(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Movement {} not found", id)))?;
        if !ctx.can_access_company(movement.id_empresa) {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Movement belongs to another company"
            )));
        }
        Ok(movement)
    }

    #[instrument(skip(self, ctx))]
    pub async fn delete_movement(&self, ctx: &AuthContext, id: Uuid) -> Result<(), AppError> {
        // Scope check happens on the fetch.
        let _ = self.movement(ctx, id).await?;
        let deleted = self.movements.delete_movement(id).await?;
        if !deleted {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Movement {} not found",
                id
            )));
        }
        Ok(())
    }

    pub async fn movements_by_date(
        &self,
        ctx: &AuthContext,
        fecha: NaiveDate,
        id_empresa: Option<Uuid>,
        plataforma: Option<&str>,
    ) -> Result<Vec<Movement>, AppError> {
        let id_empresa = if ctx.is_superadmin() {
            id_empresa
        } else {
            Some(ctx.company_id)
        };
        self.movements
            .movements_by_date(fecha, id_empresa, plataforma)
            .await
    }

    pub async fn movements_by_property(
        &self,
        ctx: &AuthContext,
        id_inmueble: Uuid,
        fecha: NaiveDate,
    ) -> Result<Vec<Movement>, AppError> {
        let movements = self
            .movements
            .movements_by_property(id_inmueble, fecha)
            .await?;
        Ok(movements
            .into_iter()
            .filter(|m| ctx.can_access_company(m.id_empresa))
            .collect())
    }

    pub async fn movements_by_payment(&self, id_pago: Uuid) -> Result<Vec<Movement>, AppError> {
        self.movements.movements_by_payment(id_pago).await
    }

    pub async fn delete_movements_by_payment(&self, id_pago: Uuid) -> Result<u64, AppError> {
        let ids = self.movements.delete_movements_by_payment(id_pago).await?;
        Ok(ids.len() as u64)
    }

    /// Income/expense aggregation for one day, optionally company-scoped.
    #[instrument(skip(self, ctx))]
    pub async fn daily_summary(
        &self,
        ctx: &AuthContext,
        fecha: NaiveDate,
        id_empresa: Option<Uuid>,
    ) -> Result<DailySummary, AppError> {
        let movements = self
            .movements_by_date(ctx, fecha, id_empresa, None)
            .await?;
        Ok(fold_daily(fecha, &movements))
    }

    /// Reservation income grouped by originating sales platform for a date
    /// range and company.
    #[instrument(skip(self, ctx))]
    pub async fn platform_report(
        &self,
        ctx: &AuthContext,
        desde: NaiveDate,
        hasta: NaiveDate,
        id_empresa: Uuid,
    ) -> Result<BTreeMap<String, PlatformTotals>, AppError> {
        if !ctx.can_access_company(id_empresa) {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Report belongs to another company"
            )));
        }
        if desde > hasta {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invalid date range: desde is after hasta"
            )));
        }

        let movements = self
            .movements
            .reservation_income_between(desde, hasta, id_empresa)
            .await?;
        Ok(group_by_platform(&movements))
    }
}
