//! Application startup and lifecycle management.

use crate::config::Config;
use crate::handlers::{movements, payments, reconciliation, reports};
use crate::services::metrics::{get_metrics, init_metrics};
use crate::services::{Database, MovementLedger, MovementSync, PaymentService, TotalsReconciler};
use axum::{
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub payments: Arc<PaymentService>,
    pub reconciler: Arc<TotalsReconciler>,
    pub sync: Arc<MovementSync>,
    pub ledger: Arc<MovementLedger>,
}

/// Health check endpoint for Docker/K8s liveness probes.
async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "finance-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness check endpoint. Ready means the database answers.
async fn readiness_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::warn!("Readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "not ready" })),
            )
        }
    }
}

/// Prometheus metrics endpoint.
async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: Config) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;
        db.run_migrations().await?;

        let state = Self::assemble_state(config, db);

        // Port 0 = random port for testing
        let bind_address: std::net::IpAddr = state
            .config
            .common
            .bind_address
            .parse()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid bind address: {}", e)))?;
        let addr = SocketAddr::from((bind_address, state.config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Finance service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Wire the service graph over an already-connected database.
    pub fn assemble_state(config: Config, db: Database) -> AppState {
        let reservations: Arc<dyn crate::services::store::ReservationStore> = Arc::new(db.clone());
        let payment_store: Arc<dyn crate::services::store::PaymentStore> = Arc::new(db.clone());
        let movement_store: Arc<dyn crate::services::store::MovementStore> = Arc::new(db.clone());

        let reconciler = Arc::new(TotalsReconciler::new(
            reservations.clone(),
            payment_store.clone(),
        ));
        let sync = Arc::new(MovementSync::new(
            reservations.clone(),
            payment_store.clone(),
            movement_store.clone(),
        ));
        let payments = Arc::new(PaymentService::new(
            reservations,
            payment_store.clone(),
            reconciler.clone(),
            sync.clone(),
        ));
        let ledger = Arc::new(MovementLedger::new(movement_store, payment_store));

        AppState {
            config,
            db,
            payments,
            reconciler,
            sync,
            ledger,
        }
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get the application state for sharing with tests.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the API router over the given state.
    pub fn router(state: AppState) -> Router {
        let api = Router::new()
            .route(
                "/pagos",
                post(payments::create_payment).get(payments::list_payments),
            )
            .route(
                "/pagos/:id",
                get(payments::get_payment)
                    .put(payments::update_payment)
                    .delete(payments::delete_payment),
            )
            .route("/pagos/:id/movimientos", get(movements::movements_by_payment))
            .route(
                "/reservas/:id/pagos",
                get(payments::payments_by_reservation),
            )
            .route(
                "/reservas/:id/recalcular-totales",
                post(reconciliation::recompute_totals),
            )
            .route(
                "/reservas/:id/consistencia",
                get(reconciliation::verify_consistency),
            )
            .route(
                "/reservas/:id/resincronizar-movimientos",
                post(reconciliation::resync_movements),
            )
            .route(
                "/empresas/:id/recalcular-totales",
                post(reconciliation::recompute_company),
            )
            .route(
                "/reconciliacion/recalcular",
                post(reconciliation::recompute_many),
            )
            .route(
                "/movimientos",
                post(movements::create_movement).get(movements::movements_by_date),
            )
            .route(
                "/movimientos/:id",
                get(movements::get_movement)
                    .put(movements::update_movement)
                    .delete(movements::delete_movement),
            )
            .route(
                "/inmuebles/:id/movimientos",
                get(movements::movements_by_property),
            )
            .route("/reportes/resumen-diario", get(reports::daily_summary))
            .route("/reportes/plataformas", get(reports::platform_report));

        Router::new()
            .nest("/api", api)
            .route("/health", get(health_check))
            .route("/ready", get(readiness_check))
            .route("/metrics", get(metrics_endpoint))
            .layer(middleware::from_fn(metrics_middleware))
            .layer(middleware::from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = Self::router(self.state);
        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
