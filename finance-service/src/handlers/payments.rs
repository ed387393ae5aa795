//! Payment handlers.
//!
//! All operations are scoped to the caller's company; superadmins see across
//! companies.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    dtos::{
        CreatePaymentRequest, PaginatedResponse, PaymentListQuery, PaymentsWithSummaryResponse,
        UpdatePaymentRequest,
    },
    middleware::AuthContext,
    models::{Payment, PaymentFilter},
    services::payments::{CreatedPayment, DeletedPayment, UpdatedPayment},
    AppState,
};
use service_core::error::AppError;

/// Register a payment against a reservation.
pub async fn create_payment(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(payload): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<CreatedPayment>), AppError> {
    let input = payload.into_new_payment(ctx.company_id);
    let created = state.payments.create_payment(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_payment(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>, AppError> {
    let payment = state.payments.payment(&ctx, id).await?;
    Ok(Json(payment))
}

pub async fn update_payment(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePaymentRequest>,
) -> Result<Json<UpdatedPayment>, AppError> {
    let updated = state.payments.update_payment(&ctx, id, payload.into()).await?;
    Ok(Json(updated))
}

pub async fn delete_payment(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedPayment>, AppError> {
    let deleted = state.payments.delete_payment(&ctx, id).await?;
    Ok(Json(deleted))
}

/// Payments of one reservation plus the computed summary.
pub async fn payments_by_reservation(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id_reserva): Path<Uuid>,
) -> Result<Json<PaymentsWithSummaryResponse>, AppError> {
    let (pagos, resumen) = state
        .payments
        .payments_with_summary(&ctx, id_reserva)
        .await?;
    Ok(Json(PaymentsWithSummaryResponse { pagos, resumen }))
}

/// Filtered, paginated payment listing.
pub async fn list_payments(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<PaymentListQuery>,
) -> Result<Json<PaginatedResponse<Payment>>, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = crate::services::payments::effective_page_size(query.limit.unwrap_or(0));
    let filter = PaymentFilter {
        id_reserva: query.id_reserva,
        desde: query.desde,
        hasta: query.hasta,
        metodo_pago: query.metodo_pago,
        id_empresa: query.id_empresa,
    };

    let (items, total) = state.payments.list_payments(&ctx, filter, page, limit).await?;
    Ok(Json(PaginatedResponse {
        items,
        total,
        page,
        limit,
    }))
}
