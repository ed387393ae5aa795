//! Database service for finance-service.
//!
//! Wraps the PostgreSQL pool and implements the storage traits the finance
//! components are built against.

use crate::models::{
    Movement, MovementChanges, NewMovement, NewPayment, Payment, PaymentChanges, PaymentFilter,
    ReservationFinance,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{MovementStore, PaymentStore, ReservationStore};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "finance-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for Database {
    #[instrument(skip(self))]
    async fn reservation_finance(&self, id: Uuid) -> Result<Option<ReservationFinance>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["reservation_finance"])
            .start_timer();

        let reservation = sqlx::query_as::<_, ReservationFinance>(
            r#"
            SELECT id, codigo, total_reserva, total_pagado, total_pendiente,
                   id_inmueble, id_empresa, plataforma
            FROM reservas
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get reservation: {}", e)))?;

        timer.observe_duration();
        Ok(reservation)
    }

    #[instrument(skip(self))]
    async fn update_totals(
        &self,
        id: Uuid,
        total_pagado: Decimal,
        total_pendiente: Decimal,
    ) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_totals"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE reservas
            SET total_pagado = $2, total_pendiente = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(total_pagado)
        .bind(total_pendiente)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update totals: {}", e)))?;

        timer.observe_duration();
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn reservation_ids_by_company(&self, id_empresa: Uuid) -> Result<Vec<Uuid>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["reservation_ids_by_company"])
            .start_timer();

        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM reservas WHERE id_empresa = $1 ORDER BY id",
        )
        .bind(id_empresa)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list reservations: {}", e))
        })?;

        timer.observe_duration();
        Ok(ids)
    }
}

const PAYMENT_COLUMNS: &str = "id, id_reserva, monto, fecha_pago, metodo_pago, concepto, \
     descripcion, comprobante, id_empresa, id_usuario_registro, created_at, updated_at";

#[async_trait]
impl PaymentStore for Database {
    #[instrument(skip(self, input), fields(id_reserva = %input.id_reserva, monto = %input.monto))]
    async fn insert_payment(&self, input: &NewPayment) -> Result<Payment, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_payment"])
            .start_timer();

        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO pagos (id, id_reserva, monto, fecha_pago, metodo_pago, concepto,
                               descripcion, comprobante, id_empresa, id_usuario_registro)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(input.id_reserva)
        .bind(input.monto)
        .bind(input.fecha_pago)
        .bind(input.metodo_pago)
        .bind(input.concepto)
        .bind(&input.descripcion)
        .bind(&input.comprobante)
        .bind(input.id_empresa)
        .bind(input.id_usuario_registro)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert payment: {}", e)))?;

        timer.observe_duration();
        Ok(payment)
    }

    #[instrument(skip(self))]
    async fn payment(&self, id: Uuid) -> Result<Option<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["payment"])
            .start_timer();

        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM pagos WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get payment: {}", e)))?;

        timer.observe_duration();
        Ok(payment)
    }

    #[instrument(skip(self))]
    async fn payments_by_reservation(&self, id_reserva: Uuid) -> Result<Vec<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["payments_by_reservation"])
            .start_timer();

        let payments = sqlx::query_as::<_, Payment>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM pagos
            WHERE id_reserva = $1
            ORDER BY fecha_pago, created_at
            "#
        ))
        .bind(id_reserva)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list payments: {}", e)))?;

        timer.observe_duration();
        Ok(payments)
    }

    #[instrument(skip(self, filter))]
    async fn list_payments(
        &self,
        filter: &PaymentFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Payment>, i64), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_payments"])
            .start_timer();

        let metodo = filter.metodo_pago.map(|m| m.as_str());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM pagos
            WHERE ($1::uuid IS NULL OR id_reserva = $1)
              AND ($2::date IS NULL OR fecha_pago >= $2)
              AND ($3::date IS NULL OR fecha_pago <= $3)
              AND ($4::varchar IS NULL OR metodo_pago = $4)
              AND ($5::uuid IS NULL OR id_empresa = $5)
            "#,
        )
        .bind(filter.id_reserva)
        .bind(filter.desde)
        .bind(filter.hasta)
        .bind(metodo)
        .bind(filter.id_empresa)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to count payments: {}", e)))?;

        let payments = sqlx::query_as::<_, Payment>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM pagos
            WHERE ($1::uuid IS NULL OR id_reserva = $1)
              AND ($2::date IS NULL OR fecha_pago >= $2)
              AND ($3::date IS NULL OR fecha_pago <= $3)
              AND ($4::varchar IS NULL OR metodo_pago = $4)
              AND ($5::uuid IS NULL OR id_empresa = $5)
            ORDER BY fecha_pago DESC, created_at DESC
            LIMIT $6 OFFSET $7
            "#
        ))
        .bind(filter.id_reserva)
        .bind(filter.desde)
        .bind(filter.hasta)
        .bind(metodo)
        .bind(filter.id_empresa)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list payments: {}", e)))?;

        timer.observe_duration();
        Ok((payments, total))
    }

    #[instrument(skip(self, changes))]
    async fn update_payment(
        &self,
        id: Uuid,
        changes: &PaymentChanges,
    ) -> Result<Option<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_payment"])
            .start_timer();

        let current = match self.payment(id).await? {
            Some(p) => p,
            None => return Ok(None),
        };

        let monto = changes.monto.unwrap_or(current.monto);
        let fecha_pago = changes.fecha_pago.unwrap_or(current.fecha_pago);
        let metodo_pago = changes.metodo_pago.unwrap_or(current.metodo_pago);
        let concepto = changes.concepto.unwrap_or(current.concepto);
        let descripcion = changes
            .descripcion
            .clone()
            .unwrap_or(current.descripcion);
        let comprobante = changes
            .comprobante
            .clone()
            .unwrap_or(current.comprobante);

        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE pagos
            SET monto = $2, fecha_pago = $3, metodo_pago = $4, concepto = $5,
                descripcion = $6, comprobante = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(monto)
        .bind(fecha_pago)
        .bind(metodo_pago)
        .bind(concepto)
        .bind(&descripcion)
        .bind(&comprobante)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update payment: {}", e)))?;

        timer.observe_duration();
        Ok(payment)
    }

    #[instrument(skip(self))]
    async fn delete_payment(&self, id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_payment"])
            .start_timer();

        let result = sqlx::query("DELETE FROM pagos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete payment: {}", e))
            })?;

        timer.observe_duration();
        Ok(result.rows_affected() > 0)
    }
}

const MOVEMENT_COLUMNS: &str = "id, fecha, tipo, concepto, descripcion, monto, id_inmueble, \
     id_reserva, metodo_pago, comprobante, id_empresa, plataforma_origen, id_pago, \
     created_at, updated_at";

#[async_trait]
impl MovementStore for Database {
    #[instrument(skip(self, input), fields(tipo = %input.tipo, monto = %input.monto))]
    async fn insert_movement(&self, input: &NewMovement) -> Result<Movement, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_movement"])
            .start_timer();

        let movement = sqlx::query_as::<_, Movement>(&format!(
            r#"
            INSERT INTO movimientos (id, fecha, tipo, concepto, descripcion, monto, id_inmueble,
                                     id_reserva, metodo_pago, comprobante, id_empresa,
                                     plataforma_origen, id_pago)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {MOVEMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(input.fecha)
        .bind(input.tipo)
        .bind(&input.concepto)
        .bind(&input.descripcion)
        .bind(input.monto)
        .bind(input.id_inmueble)
        .bind(input.id_reserva)
        .bind(input.metodo_pago)
        .bind(&input.comprobante)
        .bind(input.id_empresa)
        .bind(&input.plataforma_origen)
        .bind(input.id_pago)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to insert movement: {}", e))
        })?;

        timer.observe_duration();
        Ok(movement)
    }

    #[instrument(skip(self))]
    async fn movement(&self, id: Uuid) -> Result<Option<Movement>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["movement"])
            .start_timer();

        let movement = sqlx::query_as::<_, Movement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movimientos WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get movement: {}", e)))?;

        timer.observe_duration();
        Ok(movement)
    }

    #[instrument(skip(self, changes))]
    async fn update_movement(
        &self,
        id: Uuid,
        changes: &MovementChanges,
    ) -> Result<Option<Movement>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_movement"])
            .start_timer();

        let current = match self.movement(id).await? {
            Some(m) => m,
            None => return Ok(None),
        };

        let fecha = changes.fecha.unwrap_or(current.fecha);
        let tipo = changes.tipo.unwrap_or(current.tipo);
        let concepto = changes.concepto.clone().unwrap_or(current.concepto);
        let descripcion = changes.descripcion.clone().unwrap_or(current.descripcion);
        let monto = changes.monto.unwrap_or(current.monto);
        let metodo_pago = changes.metodo_pago.unwrap_or(current.metodo_pago);
        let comprobante = changes.comprobante.clone().unwrap_or(current.comprobante);
        let plataforma_origen = changes
            .plataforma_origen
            .clone()
            .unwrap_or(current.plataforma_origen);

        let movement = sqlx::query_as::<_, Movement>(&format!(
            r#"
            UPDATE movimientos
            SET fecha = $2, tipo = $3, concepto = $4, descripcion = $5, monto = $6,
                metodo_pago = $7, comprobante = $8, plataforma_origen = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING {MOVEMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(fecha)
        .bind(tipo)
        .bind(&concepto)
        .bind(&descripcion)
        .bind(monto)
        .bind(metodo_pago)
        .bind(&comprobante)
        .bind(&plataforma_origen)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update movement: {}", e))
        })?;

        timer.observe_duration();
        Ok(movement)
    }

    #[instrument(skip(self))]
    async fn delete_movement(&self, id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_movement"])
            .start_timer();

        let result = sqlx::query("DELETE FROM movimientos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete movement: {}", e))
            })?;

        timer.observe_duration();
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn movements_by_date(
        &self,
        fecha: NaiveDate,
        id_empresa: Option<Uuid>,
        plataforma: Option<&str>,
    ) -> Result<Vec<Movement>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["movements_by_date"])
            .start_timer();

        let movements = sqlx::query_as::<_, Movement>(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM movimientos
            WHERE fecha = $1
              AND ($2::uuid IS NULL OR id_empresa = $2)
              AND ($3::varchar IS NULL OR plataforma_origen = $3)
            ORDER BY created_at
            "#
        ))
        .bind(fecha)
        .bind(id_empresa)
        .bind(plataforma)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list movements: {}", e)))?;

        timer.observe_duration();
        Ok(movements)
    }

    #[instrument(skip(self))]
    async fn movements_by_property(
        &self,
        id_inmueble: Uuid,
        fecha: NaiveDate,
    ) -> Result<Vec<Movement>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["movements_by_property"])
            .start_timer();

        let movements = sqlx::query_as::<_, Movement>(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM movimientos
            WHERE id_inmueble = $1 AND fecha = $2
            ORDER BY created_at
            "#
        ))
        .bind(id_inmueble)
        .bind(fecha)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list movements: {}", e)))?;

        timer.observe_duration();
        Ok(movements)
    }

    #[instrument(skip(self))]
    async fn movements_by_payment(&self, id_pago: Uuid) -> Result<Vec<Movement>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["movements_by_payment"])
            .start_timer();

        let movements = sqlx::query_as::<_, Movement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movimientos WHERE id_pago = $1 ORDER BY created_at"
        ))
        .bind(id_pago)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list movements: {}", e)))?;

        timer.observe_duration();
        Ok(movements)
    }

    #[instrument(skip(self))]
    async fn delete_movements_by_payment(&self, id_pago: Uuid) -> Result<Vec<Uuid>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_movements_by_payment"])
            .start_timer();

        let ids = sqlx::query_scalar::<_, Uuid>(
            "DELETE FROM movimientos WHERE id_pago = $1 RETURNING id",
        )
        .bind(id_pago)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to delete movements: {}", e))
        })?;

        timer.observe_duration();
        Ok(ids)
    }

    #[instrument(skip(self))]
    async fn reservation_income_between(
        &self,
        desde: NaiveDate,
        hasta: NaiveDate,
        id_empresa: Uuid,
    ) -> Result<Vec<Movement>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["reservation_income_between"])
            .start_timer();

        let movements = sqlx::query_as::<_, Movement>(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM movimientos
            WHERE tipo = 'ingreso'
              AND concepto = 'reserva'
              AND plataforma_origen IS NOT NULL
              AND id_empresa = $1
              AND fecha >= $2
              AND fecha <= $3
            ORDER BY fecha, created_at
            "#
        ))
        .bind(id_empresa)
        .bind(desde)
        .bind(hasta)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list platform income: {}", e))
        })?;

        timer.observe_duration();
        Ok(movements)
    }
}
