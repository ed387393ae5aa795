//! Business rules for accepting a payment against a reservation.
//!
//! Pure functions with no storage dependency: callers supply the reservation
//! total and the current paid amount (on update, the sum of *other* payments,
//! so the edited payment does not count against itself).

use crate::models::{EstadoPago, LastPayment, Payment, PaymentSummary, ReservationFinance};
use rust_decimal::{Decimal, RoundingStrategy};

/// Outcome of validating a proposed payment amount. Errors block the
/// operation; warnings are advisory and returned alongside a success.
#[derive(Debug, Clone)]
pub struct PaymentValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Validate a proposed payment amount against the reservation's money state.
///
/// Rules run in order; all failures are collected so the caller can surface
/// the full list.
pub fn validate_monto(
    monto_nuevo: Decimal,
    total_reserva: Decimal,
    total_pagado_actual: Decimal,
) -> PaymentValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if monto_nuevo <= Decimal::ZERO {
        errors.push("El monto del pago debe ser mayor a 0".to_string());
    }

    if monto_nuevo > total_reserva {
        errors.push(format!(
            "El monto del pago ({monto_nuevo}) no puede exceder el total de la reserva ({total_reserva})"
        ));
    }

    let total_acumulado = total_pagado_actual + monto_nuevo;
    if total_acumulado > total_reserva {
        let exceso = total_acumulado - total_reserva;
        errors.push(format!(
            "El pago excede el total de la reserva por {exceso} \
             (total_reserva: {total_reserva}, total_pagado: {total_pagado_actual}, monto: {monto_nuevo})"
        ));
    } else {
        let pendiente = total_reserva - total_pagado_actual;
        if pendiente > Decimal::ZERO && monto_nuevo > pendiente {
            warnings.push(format!(
                "El monto ({monto_nuevo}) es mayor al saldo pendiente ({pendiente})"
            ));
        }
    }

    PaymentValidation {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Payment state derived from the totals.
pub fn estado_pago(total_reserva: Decimal, total_pagado: Decimal) -> EstadoPago {
    if total_pagado <= Decimal::ZERO {
        EstadoPago::SinPagos
    } else if total_pagado < total_reserva {
        EstadoPago::Parcial
    } else if total_pagado == total_reserva {
        EstadoPago::Completo
    } else {
        EstadoPago::Excedido
    }
}

/// Percentage of the reservation total already paid, rounded to 2 decimals.
pub fn porcentaje_pagado(total_reserva: Decimal, total_pagado: Decimal) -> Decimal {
    if total_reserva <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (total_pagado / total_reserva * Decimal::from(100))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Pending amount, floored at zero. The floor keeps a drifted-over-total
/// reservation from reporting negative debt.
pub fn pendiente(total_reserva: Decimal, total_pagado: Decimal) -> Decimal {
    (total_reserva - total_pagado).max(Decimal::ZERO)
}

/// Build the payment summary read-model from a reservation and its payments.
///
/// Totals are recomputed from the payment rows, not read from the cached
/// reservation columns.
pub fn build_summary(reservation: &ReservationFinance, payments: &[Payment]) -> PaymentSummary {
    let total_pagado: Decimal = payments.iter().map(|p| p.monto).sum();
    let total_reserva = reservation.total_reserva;

    let ultimo_pago = payments
        .iter()
        .max_by(|a, b| {
            a.fecha_pago
                .cmp(&b.fecha_pago)
                .then(a.created_at.cmp(&b.created_at))
        })
        .map(|p| LastPayment {
            fecha_pago: p.fecha_pago,
            monto: p.monto,
            metodo_pago: p.metodo_pago,
        });

    PaymentSummary {
        total_reserva,
        total_pagado,
        total_pendiente: pendiente(total_reserva, total_pagado),
        cantidad_pagos: payments.len(),
        porcentaje_pagado: porcentaje_pagado(total_reserva, total_pagado),
        estado_pago: estado_pago(total_reserva, total_pagado),
        ultimo_pago,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn rejects_non_positive_amount() {
        let v = validate_monto(Decimal::ZERO, dec(100_000), Decimal::ZERO);
        assert!(!v.valid);
        assert!(v.errors[0].contains("mayor a 0"));

        let v = validate_monto(dec(-500), dec(100_000), Decimal::ZERO);
        assert!(!v.valid);
    }

    #[test]
    fn rejects_amount_above_reservation_total() {
        let v = validate_monto(dec(150_000), dec(100_000), Decimal::ZERO);
        assert!(!v.valid);
        assert!(v.errors.iter().any(|e| e.contains("no puede exceder")));
    }

    #[test]
    fn rejects_accumulated_overpayment_with_excess() {
        // 100000 already paid on a 300000 reservation; 250000 more overshoots by 50000
        let v = validate_monto(dec(250_000), dec(300_000), dec(100_000));
        assert!(!v.valid);
        let msg = &v.errors[0];
        assert!(msg.contains("excede el total de la reserva por 50000"), "{msg}");
        assert!(msg.contains("total_reserva: 300000"), "{msg}");
        assert!(msg.contains("total_pagado: 100000"), "{msg}");
        assert!(msg.contains("monto: 250000"), "{msg}");
    }

    #[test]
    fn accepts_exact_remaining_amount() {
        let v = validate_monto(dec(200_000), dec(300_000), dec(100_000));
        assert!(v.valid, "{:?}", v.errors);
        assert!(v.errors.is_empty());
        assert!(v.warnings.is_empty());
    }

    #[test]
    fn overshooting_pending_is_an_error_not_a_warning() {
        // Anything above the pending amount already trips the accumulated
        // check, so the advisory warning never accompanies a rejection.
        let v = validate_monto(dec(80_000), dec(100_000), dec(30_000));
        assert!(!v.valid);
        assert!(v.warnings.is_empty());
    }

    #[test]
    fn estado_pago_thresholds() {
        assert_eq!(estado_pago(dec(100_000), dec(0)), EstadoPago::SinPagos);
        assert_eq!(estado_pago(dec(100_000), dec(60_000)), EstadoPago::Parcial);
        assert_eq!(estado_pago(dec(100_000), dec(100_000)), EstadoPago::Completo);
        assert_eq!(estado_pago(dec(100_000), dec(150_000)), EstadoPago::Excedido);
    }

    #[test]
    fn porcentaje_pagado_rounds_to_two_decimals() {
        assert_eq!(porcentaje_pagado(dec(100_000), dec(25_000)), dec(25));
        assert_eq!(porcentaje_pagado(dec(0), dec(0)), Decimal::ZERO);
        assert_eq!(porcentaje_pagado(dec(-10), dec(5)), Decimal::ZERO);

        let p = porcentaje_pagado(dec(3), dec(1));
        assert_eq!(p.to_string(), "33.33");
    }

    #[test]
    fn pendiente_never_negative() {
        assert_eq!(pendiente(dec(100_000), dec(150_000)), Decimal::ZERO);
        assert_eq!(pendiente(dec(100_000), dec(40_000)), dec(60_000));
    }
}
