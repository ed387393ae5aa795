//! Movement ledger handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    dtos::{
        CreateMovementRequest, MovementsByDateQuery, MovementsByPropertyQuery,
        UpdateMovementRequest,
    },
    middleware::AuthContext,
    models::Movement,
    AppState,
};
use service_core::error::AppError;

pub async fn create_movement(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(payload): Json<CreateMovementRequest>,
) -> Result<(StatusCode, Json<Movement>), AppError> {
    let input = payload.into_new_movement(ctx.company_id);
    let movement = state.ledger.create_movement(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

pub async fn get_movement(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Movement>, AppError> {
    let movement = state.ledger.movement(&ctx, id).await?;
    Ok(Json(movement))
}

pub async fn update_movement(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMovementRequest>,
) -> Result<Json<Movement>, AppError> {
    let movement = state.ledger.update_movement(&ctx, id, payload.into()).await?;
    Ok(Json(movement))
}

pub async fn delete_movement(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.ledger.delete_movement(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Movements of one day, optionally filtered by platform. Non-superadmins are
/// pinned to their own company.
pub async fn movements_by_date(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<MovementsByDateQuery>,
) -> Result<Json<Vec<Movement>>, AppError> {
    let movements = state
        .ledger
        .movements_by_date(&ctx, query.fecha, query.id_empresa, query.plataforma.as_deref())
        .await?;
    Ok(Json(movements))
}

pub async fn movements_by_property(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id_inmueble): Path<Uuid>,
    Query(query): Query<MovementsByPropertyQuery>,
) -> Result<Json<Vec<Movement>>, AppError> {
    let movements = state
        .ledger
        .movements_by_property(&ctx, id_inmueble, query.fecha)
        .await?;
    Ok(Json(movements))
}

/// Movements carrying a payment back-reference.
pub async fn movements_by_payment(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id_pago): Path<Uuid>,
) -> Result<Json<Vec<Movement>>, AppError> {
    // Scope check rides on the payment fetch.
    let _ = state.payments.payment(&ctx, id_pago).await?;
    let movements = state.ledger.movements_by_payment(id_pago).await?;
    Ok(Json(movements))
}
