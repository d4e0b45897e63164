use chrono::Utc;
use sqlx::PgPool;
use tracing::info;

use crate::error::{map_db_error, AppError, AppResult};
use crate::models::PaymentType;
use crate::repository::ledger as store;
use crate::repository::registry;
use crate::schemas::{RecordPaymentInput, RenewLeaseInput};

/// Share of a renewal payment withheld for the operator.
pub(crate) const MANAGEMENT_FEE_RATE: f64 = 0.10;

#[derive(Debug, Clone, serde::Serialize)]
pub struct PaymentOutcome {
    pub payment_id: i64,
    pub payment_type: PaymentType,
    pub balance_due: f64,
    pub credit: f64,
    pub debit: f64,
    pub message: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RenewalOutcome {
    pub payment_id: i64,
    pub landlord_net_amount: f64,
    pub balance_due: f64,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Classification {
    pub payment_type: PaymentType,
    pub balance_due: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FeeSplit {
    pub credit: f64,
    pub debit: f64,
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Classify an incoming amount against the tenant's current obligation.
/// An open balance takes precedence over a new cycle: the payment is
/// applied to the outstanding remainder and must not exceed it. With no
/// open balance the payment starts a new cycle against the rent due.
pub(crate) fn classify_payment(
    amount: f64,
    rent_due: f64,
    total_outstanding: f64,
) -> AppResult<Classification> {
    if amount <= 0.0 {
        return Err(AppError::Validation(
            "Payment amount must be greater than zero.".to_string(),
        ));
    }

    let target = if total_outstanding > 0.0 {
        if amount > total_outstanding {
            return Err(AppError::BusinessRule(format!(
                "Payment amount ({amount:.2}) exceeds outstanding balance ({total_outstanding:.2})."
            )));
        }
        total_outstanding
    } else {
        if amount > rent_due {
            return Err(AppError::BusinessRule(format!(
                "Payment amount ({amount:.2}) exceeds rent amount ({rent_due:.2})."
            )));
        }
        rent_due
    };

    if amount >= target {
        Ok(Classification {
            payment_type: PaymentType::Full,
            balance_due: 0.0,
        })
    } else {
        Ok(Classification {
            payment_type: PaymentType::Partial,
            balance_due: round2(target - amount),
        })
    }
}

/// Fee split stored on the payment row. The 10% fee applies only when the
/// payment closes a cycle in a single step for a renewing tenant; closing
/// a carried-over partial, or a first-ever cycle, credits the landlord in
/// full. A still-partial payment has no ledger effect yet.
pub(crate) fn fee_split(
    amount: f64,
    balance_due: f64,
    is_renewal: bool,
    had_outstanding: bool,
) -> FeeSplit {
    if balance_due > 0.0 {
        return FeeSplit {
            credit: 0.0,
            debit: 0.0,
        };
    }
    if is_renewal && !had_outstanding {
        let deduction = round2(amount * MANAGEMENT_FEE_RATE);
        return FeeSplit {
            credit: round2(amount - deduction),
            debit: deduction,
        };
    }
    FeeSplit {
        credit: amount,
        debit: 0.0,
    }
}

/// Ledger amounts for the renewal entry point. Unlike `fee_split`, the fee
/// is charged on every renewal payment event, full or partial; the credit
/// entry carries the whole amount and the fee is a separate debit.
pub(crate) fn renewal_split(amount: f64, is_renewal: bool) -> FeeSplit {
    if is_renewal {
        FeeSplit {
            credit: amount,
            debit: round2(amount * MANAGEMENT_FEE_RATE),
        }
    } else {
        FeeSplit {
            credit: amount,
            debit: 0.0,
        }
    }
}

/// Record a rent payment for an assigned tenant: classify it as full or
/// partial, compute the fee split, persist the row, and repair any stray
/// open balances once a cycle closes. One atomic transaction; any error
/// rolls back with no partial writes.
pub async fn record_payment(pool: &PgPool, input: &RecordPaymentInput) -> AppResult<PaymentOutcome> {
    let payment_date = input
        .payment_date
        .unwrap_or_else(|| Utc::now().date_naive());

    let mut tx = pool.begin().await.map_err(map_db_error)?;

    let tenant = registry::get_tenant_for_update(&mut tx, input.tenant_id).await?;
    if !tenant.is_assigned() {
        return Err(AppError::BusinessRule(
            "Tenant is not assigned to a property or unit.".to_string(),
        ));
    }
    let context = registry::billing_context(&mut tx, tenant.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tenant not found.".to_string()))?;
    let rent_due = context.rent_due()?;

    let total_outstanding = store::outstanding_balance(&mut tx, tenant.id).await?;
    let is_renewal = store::completed_cycle_count(&mut tx, tenant.id).await? >= 1;

    let classification = classify_payment(input.amount, rent_due, total_outstanding)?;
    let split = fee_split(
        input.amount,
        classification.balance_due,
        is_renewal,
        total_outstanding > 0.0,
    );

    let payment = store::insert_payment(
        &mut tx,
        &store::NewPayment {
            tenant_id: tenant.id,
            property_id: context.property_id,
            unit_id: context.unit_id,
            amount: input.amount,
            payment_type: classification.payment_type,
            payment_method: &input.payment_method,
            payment_date,
            balance_due: classification.balance_due,
            credit: split.credit,
            debit: split.debit,
            description: input.description.as_deref(),
        },
    )
    .await?;

    if total_outstanding > 0.0 && classification.balance_due == 0.0 {
        let repaired = store::settle_other_open_payments(&mut tx, tenant.id, payment.id).await?;
        if repaired > 0 {
            info!(
                tenant_id = tenant.id,
                repaired, "Settled stale open payment rows"
            );
        }
    }

    tx.commit().await.map_err(map_db_error)?;

    let message = if classification.balance_due > 0.0 {
        format!(
            "Partial payment recorded: {:.2}. Remaining balance: {:.2}.",
            input.amount, classification.balance_due
        )
    } else if split.debit > 0.0 {
        format!(
            "Renewal payment recorded: {:.2} credited to landlord (10% management fee: {:.2}).",
            split.credit, split.debit
        )
    } else {
        format!(
            "Payment completed: {:.2} credited to landlord.",
            input.amount
        )
    };

    info!(
        tenant_id = tenant.id,
        landlord_id = context.landlord_id,
        amount = input.amount,
        payment_type = ?classification.payment_type,
        balance_due = classification.balance_due,
        "Recorded rent payment"
    );

    Ok(PaymentOutcome {
        payment_id: payment.id,
        payment_type: classification.payment_type,
        balance_due: classification.balance_due,
        credit: split.credit,
        debit: split.debit,
        message,
    })
}

/// Renew a tenant's lease together with the renewal payment. Lease dates
/// are always updated and the caller's payment-type hint is trusted rather
/// than recomputed. A renewing tenant is charged the 10% fee on every
/// renewal payment event, partial or full; this intentionally diverges
/// from `record_payment`, which defers the fee to cycle completion.
pub async fn renew_lease_with_payment(
    pool: &PgPool,
    tenant_id: i64,
    input: &RenewLeaseInput,
) -> AppResult<RenewalOutcome> {
    if input.new_end_date <= input.new_start_date {
        return Err(AppError::Validation(
            "Lease end date must be after the start date.".to_string(),
        ));
    }
    let payment_date = input
        .payment_date
        .unwrap_or_else(|| Utc::now().date_naive());

    let mut tx = pool.begin().await.map_err(map_db_error)?;

    let tenant = registry::get_tenant_for_update(&mut tx, tenant_id).await?;
    if !tenant.is_assigned() {
        return Err(AppError::BusinessRule(
            "Tenant is not assigned to a property or unit.".to_string(),
        ));
    }
    let context = registry::billing_context(&mut tx, tenant.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tenant not found.".to_string()))?;
    let rent_due = context.rent_due()?;

    let is_renewal = store::completed_cycle_count(&mut tx, tenant.id).await? >= 1;

    let balance_due = match input.payment_type {
        PaymentType::Partial => round2((rent_due - input.amount).max(0.0)),
        PaymentType::Full => 0.0,
    };

    registry::update_lease_dates(&mut tx, tenant.id, input.new_start_date, input.new_end_date)
        .await?;

    let payment_description = input
        .description
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| {
            format!(
                "Lease renewal payment ({} to {})",
                input.new_start_date, input.new_end_date
            )
        });

    let payment = store::insert_payment(
        &mut tx,
        &store::NewPayment {
            tenant_id: tenant.id,
            property_id: context.property_id,
            unit_id: context.unit_id,
            amount: input.amount,
            payment_type: input.payment_type,
            payment_method: &input.payment_method,
            payment_date,
            balance_due,
            credit: 0.0,
            debit: 0.0,
            description: Some(payment_description.as_str()),
        },
    )
    .await?;

    let split = renewal_split(input.amount, is_renewal);
    let credit_narration = if is_renewal {
        input
            .description
            .clone()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| format!("Rent renewal - {}", context.tenant_name))
    } else {
        input
            .description
            .clone()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| format!("Rent payment - {} (first payment)", context.tenant_name))
    };

    store::insert_entry(
        &mut tx,
        &store::NewLedgerEntry {
            landlord_id: context.landlord_id,
            entry_date: payment_date,
            narration: &credit_narration,
            entry_type: crate::models::EntryType::Credit,
            amount: split.credit,
            payment_method: &input.payment_method,
        },
    )
    .await?;

    if split.debit > 0.0 {
        let fee_narration = format!("Management fee deduction (10% of {:.2})", input.amount);
        store::insert_entry(
            &mut tx,
            &store::NewLedgerEntry {
                landlord_id: context.landlord_id,
                entry_date: payment_date,
                narration: &fee_narration,
                entry_type: crate::models::EntryType::Debit,
                amount: split.debit,
                payment_method: "Automatic Deduction",
            },
        )
        .await?;
    }

    tx.commit().await.map_err(map_db_error)?;

    let landlord_net_amount = round2(split.credit - split.debit);
    let message = if is_renewal {
        format!(
            "Lease renewed: payment of {:.2} recorded. Net amount to landlord: {:.2} (10% fee: {:.2} deducted).",
            input.amount, landlord_net_amount, split.debit
        )
    } else {
        format!(
            "Lease renewed: payment of {:.2} recorded. Full amount credited to landlord (first payment, no fee).",
            input.amount
        )
    };

    info!(
        tenant_id = tenant.id,
        landlord_id = context.landlord_id,
        amount = input.amount,
        is_renewal,
        balance_due,
        "Renewed lease with payment"
    );

    Ok(RenewalOutcome {
        payment_id: payment.id,
        landlord_net_amount,
        balance_due,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::{classify_payment, fee_split, renewal_split, round2, MANAGEMENT_FEE_RATE};
    use crate::error::AppError;
    use crate::models::PaymentType;

    #[test]
    fn full_payment_closes_a_new_cycle() {
        let got = classify_payment(1500.0, 1500.0, 0.0).unwrap();
        assert_eq!(got.payment_type, PaymentType::Full);
        assert_eq!(got.balance_due, 0.0);

        let split = fee_split(1500.0, got.balance_due, false, false);
        assert_eq!(split.credit, 1500.0);
        assert_eq!(split.debit, 0.0);
    }

    #[test]
    fn partial_payment_carries_the_remainder() {
        let got = classify_payment(1000.0, 1500.0, 0.0).unwrap();
        assert_eq!(got.payment_type, PaymentType::Partial);
        assert_eq!(got.balance_due, 500.0);

        // No ledger effect until the cycle closes.
        let split = fee_split(1000.0, got.balance_due, false, false);
        assert_eq!(split.credit, 0.0);
        assert_eq!(split.debit, 0.0);
    }

    #[test]
    fn completing_a_partial_closes_without_fee() {
        let got = classify_payment(500.0, 1500.0, 500.0).unwrap();
        assert_eq!(got.payment_type, PaymentType::Full);
        assert_eq!(got.balance_due, 0.0);

        // Even a renewing tenant pays no fee when merely closing a
        // carried-over partial.
        let split = fee_split(500.0, got.balance_due, true, true);
        assert_eq!(split.credit, 500.0);
        assert_eq!(split.debit, 0.0);
    }

    #[test]
    fn renewal_completion_splits_ten_percent() {
        let split = fee_split(2000.0, 0.0, true, false);
        assert_eq!(split.debit, 200.0);
        assert_eq!(split.credit, 1800.0);
        assert_eq!(split.credit + split.debit, 2000.0);
    }

    #[test]
    fn fee_is_exactly_ten_percent_of_amount() {
        for amount in [100.0, 750.0, 1500.0, 2000.0, 12345.0] {
            let split = fee_split(amount, 0.0, true, false);
            assert_eq!(split.debit, round2(amount * MANAGEMENT_FEE_RATE));
            assert_eq!(round2(split.credit + split.debit), amount);
        }
    }

    #[test]
    fn overpaying_an_outstanding_balance_is_rejected() {
        let err = classify_payment(2000.0, 1500.0, 500.0).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
        assert!(err.to_string().contains("exceeds outstanding balance"));
    }

    #[test]
    fn overpaying_the_rent_is_rejected() {
        let err = classify_payment(2000.0, 1500.0, 0.0).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
        assert!(err.to_string().contains("exceeds rent amount"));
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert!(matches!(
            classify_payment(0.0, 1500.0, 0.0),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            classify_payment(-25.0, 1500.0, 0.0),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn classification_is_deterministic() {
        let first = classify_payment(1000.0, 1500.0, 0.0).unwrap();
        let second = classify_payment(1000.0, 1500.0, 0.0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn renewal_entry_point_charges_fee_even_on_partial() {
        // The renewal path charges the fee on every renewal event, not at
        // cycle completion.
        let split = renewal_split(800.0, true);
        assert_eq!(split.credit, 800.0);
        assert_eq!(split.debit, 80.0);

        let first = renewal_split(800.0, false);
        assert_eq!(first.credit, 800.0);
        assert_eq!(first.debit, 0.0);
    }

    #[test]
    fn rounds_to_cents() {
        assert_eq!(round2(0.1 + 0.2), 0.3);
        assert_eq!(round2(10.0 / 3.0), 3.33);
    }
}
