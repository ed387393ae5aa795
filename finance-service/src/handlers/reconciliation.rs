//! Reconciliation and repair handlers.
//!
//! These are the operational endpoints for recovering from drift: totals
//! recomputation, consistency verification, and movement backfill.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    dtos::RecomputeManyRequest,
    middleware::AuthContext,
    models::{BatchOutcome, ConsistencyReport, ReservationTotals, ResyncOutcome},
    services::store::ReservationStore,
    AppState,
};
use service_core::error::AppError;

async fn check_reservation_scope(
    state: &AppState,
    ctx: &AuthContext,
    id_reserva: Uuid,
) -> Result<(), AppError> {
    let reservation = state
        .db
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
    Ok(())
}

/// Recompute one reservation's cached totals from its payments.
pub async fn recompute_totals(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id_reserva): Path<Uuid>,
) -> Result<Json<ReservationTotals>, AppError> {
    check_reservation_scope(&state, &ctx, id_reserva).await?;
    let totals = state.reconciler.recompute(id_reserva).await?;
    Ok(Json(totals))
}

/// Compare stored totals against recomputed ones without writing.
pub async fn verify_consistency(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id_reserva): Path<Uuid>,
) -> Result<Json<ConsistencyReport>, AppError> {
    check_reservation_scope(&state, &ctx, id_reserva).await?;
    let report = state.reconciler.verify_consistency(id_reserva).await?;
    Ok(Json(report))
}

/// Recompute an explicit list of reservations. Superadmin only; the ids may
/// span companies.
pub async fn recompute_many(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(payload): Json<RecomputeManyRequest>,
) -> Result<Json<BatchOutcome>, AppError> {
    if !ctx.is_superadmin() {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Batch recompute requires superadmin"
        )));
    }
    let outcome = state.reconciler.recompute_many(&payload.ids).await;
    Ok(Json(outcome))
}

/// Recompute every reservation of the caller's company.
pub async fn recompute_company(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id_empresa): Path<Uuid>,
) -> Result<Json<BatchOutcome>, AppError> {
    if !ctx.can_access_company(id_empresa) {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Company belongs to another caller"
        )));
    }
    let outcome = state.reconciler.recompute_company(id_empresa).await?;
    Ok(Json(outcome))
}

/// Backfill missing movements for every payment of a reservation.
pub async fn resync_movements(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id_reserva): Path<Uuid>,
) -> Result<Json<ResyncOutcome>, AppError> {
    check_reservation_scope(&state, &ctx, id_reserva).await?;
    let outcome = state.sync.resync_reservation(id_reserva).await?;
    Ok(Json(outcome))
}
