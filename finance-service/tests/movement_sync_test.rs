//! Payment to movement derivation and the resync repair path.

mod common;

use common::{admin_ctx, build_app, new_payment, reservation};
use finance_service::models::{ConceptoPago, TipoMovimiento};
use finance_service::services::store::PaymentStore;
use rust_decimal::Decimal;
use std::sync::atomic::Ordering;
use uuid::Uuid;

#[tokio::test]
async fn derivation_skips_reservation_without_property() {
    let app = build_app();
    let empresa = Uuid::new_v4();
    let mut reserva = reservation(empresa, 300_000, Some("airbnb"));
    reserva.id_inmueble = None;
    let id_reserva = reserva.id;
    app.store.seed_reservation(reserva);
    let ctx = admin_ctx(empresa);

    let created = app
        .payments
        .create_payment(&ctx, new_payment(id_reserva, empresa, 50_000))
        .await
        .unwrap();

    // Payment stands, movement does not.
    assert!(!created.movimiento_creado);
    assert_eq!(app.store.payment_count(), 1);
    assert_eq!(app.store.movement_count(), 0);
}

#[tokio::test]
async fn cleaning_payment_maps_to_limpieza_without_platform() {
    let app = build_app();
    let empresa = Uuid::new_v4();
    let reserva = reservation(empresa, 300_000, Some("airbnb"));
    let id_reserva = reserva.id;
    app.store.seed_reservation(reserva);
    let ctx = admin_ctx(empresa);

    let mut input = new_payment(id_reserva, empresa, 20_000);
    input.concepto = ConceptoPago::LimpiezaExtra;
    let created = app.payments.create_payment(&ctx, input).await.unwrap();
    assert!(created.movimiento_creado);

    let movements = app
        .sync
        .associated_movements(created.pago.id)
        .await
        .unwrap();
    assert_eq!(movements[0].concepto, "limpieza");
    assert_eq!(movements[0].tipo, TipoMovimiento::Ingreso);
    // The platform only rides on reservation income.
    assert!(movements[0].plataforma_origen.is_none());
}

#[tokio::test]
async fn resync_backfills_only_missing_movements() {
    let app = build_app();
    let empresa = Uuid::new_v4();
    let reserva = reservation(empresa, 300_000, Some("directo"));
    let id_reserva = reserva.id;
    app.store.seed_reservation(reserva);
    let ctx = admin_ctx(empresa);

    // First payment derives normally; the next two land while the movement
    // store is down.
    app.payments
        .create_payment(&ctx, new_payment(id_reserva, empresa, 50_000))
        .await
        .unwrap();
    app.store.fail_movement_insert.store(true, Ordering::SeqCst);
    app.payments
        .create_payment(&ctx, new_payment(id_reserva, empresa, 60_000))
        .await
        .unwrap();
    app.payments
        .create_payment(&ctx, new_payment(id_reserva, empresa, 70_000))
        .await
        .unwrap();
    assert_eq!(app.store.movement_count(), 1);

    app.store
        .fail_movement_insert
        .store(false, Ordering::SeqCst);
    let outcome = app.sync.resync_reservation(id_reserva).await.unwrap();
    assert_eq!(outcome.processed, 3);
    assert_eq!(outcome.created, 2);
    assert_eq!(outcome.failed, 0);
    assert_eq!(app.store.movement_count(), 3);

    // Re-running the resync creates nothing new.
    let again = app.sync.resync_reservation(id_reserva).await.unwrap();
    assert_eq!(again.processed, 3);
    assert_eq!(again.created, 0);
}

#[tokio::test]
async fn resync_reports_unresolvable_payments() {
    let app = build_app();
    let empresa = Uuid::new_v4();
    let mut reserva = reservation(empresa, 300_000, None);
    reserva.id_inmueble = None;
    let id_reserva = reserva.id;
    app.store.seed_reservation(reserva);

    app.store
        .insert_payment(&new_payment(id_reserva, empresa, 40_000))
        .await
        .unwrap();

    let outcome = app.sync.resync_reservation(id_reserva).await.unwrap();
    assert_eq!(outcome.processed, 1);
    assert_eq!(outcome.created, 0);
    assert_eq!(outcome.failed, 1);
    assert!(outcome.errors[0].contains("no se pudo resolver el movimiento"));
}

#[tokio::test]
async fn delete_associated_returns_removed_ids() {
    let app = build_app();
    let empresa = Uuid::new_v4();
    let reserva = reservation(empresa, 300_000, Some("airbnb"));
    let id_reserva = reserva.id;
    app.store.seed_reservation(reserva);
    let ctx = admin_ctx(empresa);

    let created = app
        .payments
        .create_payment(&ctx, new_payment(id_reserva, empresa, 90_000))
        .await
        .unwrap();

    let removed = app
        .sync
        .delete_associated_movements(created.pago.id)
        .await
        .unwrap();
    assert_eq!(removed.count, 1);
    assert_eq!(removed.ids, vec![created.movimiento_id.unwrap()]);
    assert_eq!(app.store.movement_count(), 0);

    // Idempotent on an already-clean payment.
    let removed = app
        .sync
        .delete_associated_movements(created.pago.id)
        .await
        .unwrap();
    assert_eq!(removed.count, 0);
}

#[tokio::test]
async fn derived_movement_amount_follows_the_payment() {
    let app = build_app();
    let empresa = Uuid::new_v4();
    let reserva = reservation(empresa, 300_000, Some("booking"));
    let id_reserva = reserva.id;
    app.store.seed_reservation(reserva);
    let ctx = admin_ctx(empresa);

    let mut input = new_payment(id_reserva, empresa, 123_456);
    input.descripcion = Some("segundo pago".to_string());
    input.comprobante = Some("TRX-55".to_string());
    let created = app.payments.create_payment(&ctx, input).await.unwrap();

    let movements = app
        .sync
        .associated_movements(created.pago.id)
        .await
        .unwrap();
    let m = &movements[0];
    assert_eq!(m.monto, Decimal::from(123_456));
    assert_eq!(m.fecha, created.pago.fecha_pago);
    assert_eq!(m.id_reserva, Some(id_reserva));
    assert_eq!(m.id_empresa, empresa);
    let descripcion = m.descripcion.as_deref().unwrap();
    assert!(descripcion.contains("RES-2024-001"));
    assert!(descripcion.contains("segundo pago"));
    assert!(descripcion.contains("[comprobante: TRX-55]"));
}
