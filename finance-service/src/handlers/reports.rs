//! Accounting report handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use std::collections::BTreeMap;

use crate::{
    dtos::{DailySummaryQuery, PlatformReportQuery},
    middleware::AuthContext,
    models::{DailySummary, PlatformTotals},
    AppState,
};
use service_core::error::AppError;

/// Daily income/expense summary.
pub async fn daily_summary(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<DailySummaryQuery>,
) -> Result<Json<DailySummary>, AppError> {
    let summary = state
        .ledger
        .daily_summary(&ctx, query.fecha, query.id_empresa)
        .await?;
    Ok(Json(summary))
}

/// Reservation income grouped by originating sales platform.
pub async fn platform_report(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<PlatformReportQuery>,
) -> Result<Json<BTreeMap<String, PlatformTotals>>, AppError> {
    let id_empresa = query.id_empresa.unwrap_or(ctx.company_id);
    let report = state
        .ledger
        .platform_report(&ctx, query.desde, query.hasta, id_empresa)
        .await?;
    Ok(Json(report))
}
