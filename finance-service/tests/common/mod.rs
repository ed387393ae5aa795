//! In-memory storage fake and wiring helpers for integration tests.

// Not every test binary uses every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use finance_service::middleware::auth::{AuthContext, SUPERADMIN_ROLE};
use finance_service::models::{
    Movement, MovementChanges, NewMovement, NewPayment, Payment, PaymentChanges, PaymentFilter,
    ReservationFinance,
};
use finance_service::services::store::{MovementStore, PaymentStore, ReservationStore};
use finance_service::services::{MovementLedger, MovementSync, PaymentService, TotalsReconciler};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// In-memory implementation of the three storage traits, with failure
/// injection switches for the degraded-path tests.
#[derive(Default)]
pub struct InMemoryStore {
    reservations: Mutex<HashMap<Uuid, ReservationFinance>>,
    payments: Mutex<Vec<Payment>>,
    movements: Mutex<Vec<Movement>>,
    pub fail_movement_insert: AtomicBool,
    pub fail_update_totals: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_reservation(&self, reservation: ReservationFinance) {
        self.reservations
            .lock()
            .unwrap()
            .insert(reservation.id, reservation);
    }

    pub fn payment_count(&self) -> usize {
        self.payments.lock().unwrap().len()
    }

    pub fn movement_count(&self) -> usize {
        self.movements.lock().unwrap().len()
    }

    /// Overwrite the cached totals directly, bypassing the reconciler. Used to
    /// fabricate drift.
    pub fn corrupt_totals(&self, id: Uuid, total_pagado: Decimal, total_pendiente: Decimal) {
        let mut reservations = self.reservations.lock().unwrap();
        if let Some(r) = reservations.get_mut(&id) {
            r.total_pagado = total_pagado;
            r.total_pendiente = total_pendiente;
        }
    }

    pub fn stored_totals(&self, id: Uuid) -> (Decimal, Decimal) {
        let reservations = self.reservations.lock().unwrap();
        let r = reservations.get(&id).expect("reservation seeded");
        (r.total_pagado, r.total_pendiente)
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn reservation_finance(&self, id: Uuid) -> Result<Option<ReservationFinance>, AppError> {
        Ok(self.reservations.lock().unwrap().get(&id).cloned())
    }

    async fn update_totals(
        &self,
        id: Uuid,
        total_pagado: Decimal,
        total_pendiente: Decimal,
    ) -> Result<bool, AppError> {
        if self.fail_update_totals.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "injected totals failure"
            )));
        }
        let mut reservations = self.reservations.lock().unwrap();
        match reservations.get_mut(&id) {
            Some(r) => {
                r.total_pagado = total_pagado;
                r.total_pendiente = total_pendiente;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn reservation_ids_by_company(&self, id_empresa: Uuid) -> Result<Vec<Uuid>, AppError> {
        let reservations = self.reservations.lock().unwrap();
        Ok(reservations
            .values()
            .filter(|r| r.id_empresa == id_empresa)
            .map(|r| r.id)
            .collect())
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn insert_payment(&self, input: &NewPayment) -> Result<Payment, AppError> {
        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4(),
            id_reserva: input.id_reserva,
            monto: input.monto,
            fecha_pago: input.fecha_pago,
            metodo_pago: input.metodo_pago,
            concepto: input.concepto,
            descripcion: input.descripcion.clone(),
            comprobante: input.comprobante.clone(),
            id_empresa: input.id_empresa,
            id_usuario_registro: input.id_usuario_registro,
            created_at: now,
            updated_at: now,
        };
        self.payments.lock().unwrap().push(payment.clone());
        Ok(payment)
    }

    async fn payment(&self, id: Uuid) -> Result<Option<Payment>, AppError> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn payments_by_reservation(&self, id_reserva: Uuid) -> Result<Vec<Payment>, AppError> {
        let mut payments: Vec<Payment> = self
            .payments
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.id_reserva == id_reserva)
            .cloned()
            .collect();
        payments.sort_by_key(|p| (p.fecha_pago, p.created_at));
        Ok(payments)
    }

    async fn list_payments(
        &self,
        filter: &PaymentFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Payment>, i64), AppError> {
        let mut matching: Vec<Payment> = self
            .payments
            .lock()
            .unwrap()
            .iter()
            .filter(|p| {
                filter.id_reserva.map_or(true, |id| p.id_reserva == id)
                    && filter.desde.map_or(true, |d| p.fecha_pago >= d)
                    && filter.hasta.map_or(true, |h| p.fecha_pago <= h)
                    && filter.metodo_pago.map_or(true, |m| p.metodo_pago == m)
                    && filter.id_empresa.map_or(true, |e| p.id_empresa == e)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            (b.fecha_pago, b.created_at).cmp(&(a.fecha_pago, a.created_at))
        });
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn update_payment(
        &self,
        id: Uuid,
        changes: &PaymentChanges,
    ) -> Result<Option<Payment>, AppError> {
        let mut payments = self.payments.lock().unwrap();
        let Some(p) = payments.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(monto) = changes.monto {
            p.monto = monto;
        }
        if let Some(fecha_pago) = changes.fecha_pago {
            p.fecha_pago = fecha_pago;
        }
        if let Some(metodo_pago) = changes.metodo_pago {
            p.metodo_pago = metodo_pago;
        }
        if let Some(concepto) = changes.concepto {
            p.concepto = concepto;
        }
        if let Some(descripcion) = changes.descripcion.clone() {
            p.descripcion = descripcion;
        }
        if let Some(comprobante) = changes.comprobante.clone() {
            p.comprobante = comprobante;
        }
        p.updated_at = Utc::now();
        Ok(Some(p.clone()))
    }

    async fn delete_payment(&self, id: Uuid) -> Result<bool, AppError> {
        let mut payments = self.payments.lock().unwrap();
        let before = payments.len();
        payments.retain(|p| p.id != id);
        Ok(payments.len() < before)
    }
}

#[async_trait]
impl MovementStore for InMemoryStore {
    async fn insert_movement(&self, input: &NewMovement) -> Result<Movement, AppError> {
        if self.fail_movement_insert.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "injected movement failure"
            )));
        }
        let now = Utc::now();
        let movement = Movement {
            id: Uuid::new_v4(),
            fecha: input.fecha,
            tipo: input.tipo,
            concepto: input.concepto.clone(),
            descripcion: input.descripcion.clone(),
            monto: input.monto,
            id_inmueble: input.id_inmueble,
            id_reserva: input.id_reserva,
            metodo_pago: input.metodo_pago,
            comprobante: input.comprobante.clone(),
            id_empresa: input.id_empresa,
            plataforma_origen: input.plataforma_origen.clone(),
            id_pago: input.id_pago,
            created_at: now,
            updated_at: now,
        };
        self.movements.lock().unwrap().push(movement.clone());
        Ok(movement)
    }

    async fn movement(&self, id: Uuid) -> Result<Option<Movement>, AppError> {
        Ok(self
            .movements
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn update_movement(
        &self,
        id: Uuid,
        changes: &MovementChanges,
    ) -> Result<Option<Movement>, AppError> {
        let mut movements = self.movements.lock().unwrap();
        let Some(m) = movements.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };
        if let Some(fecha) = changes.fecha {
            m.fecha = fecha;
        }
        if let Some(tipo) = changes.tipo {
            m.tipo = tipo;
        }
        if let Some(concepto) = changes.concepto.clone() {
            m.concepto = concepto;
        }
        if let Some(descripcion) = changes.descripcion.clone() {
            m.descripcion = descripcion;
        }
        if let Some(monto) = changes.monto {
            m.monto = monto;
        }
        if let Some(metodo_pago) = changes.metodo_pago {
            m.metodo_pago = metodo_pago;
        }
        if let Some(comprobante) = changes.comprobante.clone() {
            m.comprobante = comprobante;
        }
        if let Some(plataforma_origen) = changes.plataforma_origen.clone() {
            m.plataforma_origen = plataforma_origen;
        }
        m.updated_at = Utc::now();
        Ok(Some(m.clone()))
    }

    async fn delete_movement(&self, id: Uuid) -> Result<bool, AppError> {
        let mut movements = self.movements.lock().unwrap();
        let before = movements.len();
        movements.retain(|m| m.id != id);
        Ok(movements.len() < before)
    }

    async fn movements_by_date(
        &self,
        fecha: NaiveDate,
        id_empresa: Option<Uuid>,
        plataforma: Option<&str>,
    ) -> Result<Vec<Movement>, AppError> {
        Ok(self
            .movements
            .lock()
            .unwrap()
            .iter()
            .filter(|m| {
                m.fecha == fecha
                    && id_empresa.map_or(true, |e| m.id_empresa == e)
                    && plataforma.map_or(true, |p| m.plataforma_origen.as_deref() == Some(p))
            })
            .cloned()
            .collect())
    }

    async fn movements_by_property(
        &self,
        id_inmueble: Uuid,
        fecha: NaiveDate,
    ) -> Result<Vec<Movement>, AppError> {
        Ok(self
            .movements
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.id_inmueble == id_inmueble && m.fecha == fecha)
            .cloned()
            .collect())
    }

    async fn movements_by_payment(&self, id_pago: Uuid) -> Result<Vec<Movement>, AppError> {
        Ok(self
            .movements
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.id_pago == Some(id_pago))
            .cloned()
            .collect())
    }

    async fn delete_movements_by_payment(&self, id_pago: Uuid) -> Result<Vec<Uuid>, AppError> {
        let mut movements = self.movements.lock().unwrap();
        let ids: Vec<Uuid> = movements
            .iter()
            .filter(|m| m.id_pago == Some(id_pago))
            .map(|m| m.id)
            .collect();
        movements.retain(|m| m.id_pago != Some(id_pago));
        Ok(ids)
    }

    async fn reservation_income_between(
        &self,
        desde: NaiveDate,
        hasta: NaiveDate,
        id_empresa: Uuid,
    ) -> Result<Vec<Movement>, AppError> {
        use finance_service::models::TipoMovimiento;
        Ok(self
            .movements
            .lock()
            .unwrap()
            .iter()
            .filter(|m| {
                m.tipo == TipoMovimiento::Ingreso
                    && m.concepto == "reserva"
                    && m.plataforma_origen.is_some()
                    && m.id_empresa == id_empresa
                    && m.fecha >= desde
                    && m.fecha <= hasta
            })
            .cloned()
            .collect())
    }
}

/// The wired finance core over one shared in-memory store.
pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    pub payments: PaymentService,
    pub reconciler: Arc<TotalsReconciler>,
    pub sync: Arc<MovementSync>,
    pub ledger: MovementLedger,
}

pub fn build_app() -> TestApp {
    let store = InMemoryStore::new();
    let reservations: Arc<dyn ReservationStore> = store.clone();
    let payment_store: Arc<dyn PaymentStore> = store.clone();
    let movement_store: Arc<dyn MovementStore> = store.clone();

    let reconciler = Arc::new(TotalsReconciler::new(
        reservations.clone(),
        payment_store.clone(),
    ));
    let sync = Arc::new(MovementSync::new(
        reservations.clone(),
        payment_store.clone(),
        movement_store.clone(),
    ));
    let payments = PaymentService::new(
        reservations,
        payment_store.clone(),
        reconciler.clone(),
        sync.clone(),
    );
    let ledger = MovementLedger::new(movement_store, payment_store);

    TestApp {
        store,
        payments,
        reconciler,
        sync,
        ledger,
    }
}

pub fn admin_ctx(company_id: Uuid) -> AuthContext {
    AuthContext {
        user_id: Uuid::new_v4(),
        company_id,
        role_id: 2,
    }
}

pub fn superadmin_ctx() -> AuthContext {
    AuthContext {
        user_id: Uuid::new_v4(),
        company_id: Uuid::new_v4(),
        role_id: SUPERADMIN_ROLE,
    }
}

pub fn reservation(
    id_empresa: Uuid,
    total_reserva: i64,
    plataforma: Option<&str>,
) -> ReservationFinance {
    ReservationFinance {
        id: Uuid::new_v4(),
        codigo: "RES-2024-001".to_string(),
        total_reserva: Decimal::from(total_reserva),
        total_pagado: Decimal::ZERO,
        total_pendiente: Decimal::from(total_reserva),
        id_inmueble: Some(Uuid::new_v4()),
        id_empresa,
        plataforma: plataforma.map(|p| p.to_string()),
    }
}

pub fn new_payment(id_reserva: Uuid, id_empresa: Uuid, monto: i64) -> NewPayment {
    use finance_service::models::{ConceptoPago, MetodoPago};
    NewPayment {
        id_reserva,
        monto: Decimal::from(monto),
        fecha_pago: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
        metodo_pago: MetodoPago::Transferencia,
        concepto: ConceptoPago::AbonoInicial,
        descripcion: None,
        comprobante: None,
        id_empresa,
        id_usuario_registro: None,
    }
}
