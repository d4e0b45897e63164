use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::error::{map_db_error, AppError, AppResult};
use crate::models::{EntryType, LedgerEntry, Payment, PaymentType};
use crate::schemas::StatementQuery;

pub struct NewPayment<'a> {
    pub tenant_id: i64,
    pub property_id: i64,
    pub unit_id: Option<i64>,
    pub amount: f64,
    pub payment_type: PaymentType,
    pub payment_method: &'a str,
    pub payment_date: NaiveDate,
    pub balance_due: f64,
    pub credit: f64,
    pub debit: f64,
    pub description: Option<&'a str>,
}

pub struct NewLedgerEntry<'a> {
    pub landlord_id: i64,
    pub entry_date: NaiveDate,
    pub narration: &'a str,
    pub entry_type: EntryType,
    pub amount: f64,
    pub payment_method: &'a str,
}

/// A raw statement source line before merging; payments and manual ledger
/// entries are both projected into this shape.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StatementRow {
    pub entry_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub narration: Option<String>,
    pub payment_method: String,
    pub tenant_name: Option<String>,
    pub property_title: Option<String>,
    pub credit: f64,
    pub debit: f64,
}

/// Sum of open balances for a tenant. At most one open row exists under
/// correct use, but the sum tolerates strays.
pub async fn outstanding_balance(conn: &mut PgConnection, tenant_id: i64) -> AppResult<f64> {
    sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(SUM(balance_due), 0)
         FROM payments
         WHERE tenant_id = $1 AND balance_due > 0",
    )
    .bind(tenant_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_db_error)
}

/// Count of fully closed cycles; one or more marks the tenant as renewing.
pub async fn completed_cycle_count(conn: &mut PgConnection, tenant_id: i64) -> AppResult<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*)
         FROM payments
         WHERE tenant_id = $1 AND payment_type = 'full' AND balance_due = 0",
    )
    .bind(tenant_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_db_error)
}

pub async fn insert_payment(conn: &mut PgConnection, new: &NewPayment<'_>) -> AppResult<Payment> {
    sqlx::query_as::<_, Payment>(
        "INSERT INTO payments (tenant_id, property_id, unit_id, amount, payment_type,
                               payment_method, payment_date, balance_due, credit, debit,
                               description)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         RETURNING *",
    )
    .bind(new.tenant_id)
    .bind(new.property_id)
    .bind(new.unit_id)
    .bind(new.amount)
    .bind(new.payment_type)
    .bind(new.payment_method)
    .bind(new.payment_date)
    .bind(new.balance_due)
    .bind(new.credit)
    .bind(new.debit)
    .bind(new.description)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_db_error)
}

/// Invariant repair: after a completing payment, force any other open rows
/// for the tenant closed so at most one logical open balance ever exists.
pub async fn settle_other_open_payments(
    conn: &mut PgConnection,
    tenant_id: i64,
    except_payment_id: i64,
) -> AppResult<u64> {
    let result = sqlx::query(
        "UPDATE payments
         SET balance_due = 0, payment_type = 'full'
         WHERE tenant_id = $1 AND balance_due > 0 AND id <> $2",
    )
    .bind(tenant_id)
    .bind(except_payment_id)
    .execute(&mut *conn)
    .await
    .map_err(map_db_error)?;
    Ok(result.rows_affected())
}

pub async fn insert_entry(
    conn: &mut PgConnection,
    new: &NewLedgerEntry<'_>,
) -> AppResult<LedgerEntry> {
    sqlx::query_as::<_, LedgerEntry>(
        "INSERT INTO landlord_transactions (landlord_id, entry_date, narration, entry_type,
                                            amount, payment_method)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(new.landlord_id)
    .bind(new.entry_date)
    .bind(new.narration)
    .bind(new.entry_type)
    .bind(new.amount)
    .bind(new.payment_method)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_db_error)
}

pub async fn list_payments(
    pool: &PgPool,
    tenant_id: Option<i64>,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<Payment>> {
    sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments
         WHERE ($1::bigint IS NULL OR tenant_id = $1)
         ORDER BY payment_date DESC, created_at DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(tenant_id)
    .bind(limit)
    .bind(offset.max(0))
    .fetch_all(pool)
    .await
    .map_err(map_db_error)
}

pub async fn get_payment(pool: &PgPool, payment_id: i64) -> AppResult<Payment> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
        .bind(payment_id)
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| AppError::NotFound("Payment not found.".to_string()))
}

/// Payment-derived statement lines for one landlord. The payment's own
/// fee split is not consulted; the whole amount shows as landlord credit.
pub async fn payment_statement_rows(
    pool: &PgPool,
    landlord_id: i64,
    filter: &StatementQuery,
) -> AppResult<Vec<StatementRow>> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT pay.payment_date AS entry_date,
                pay.created_at,
                pay.description AS narration,
                pay.payment_method,
                t.full_name AS tenant_name,
                prop.title AS property_title,
                pay.amount AS credit,
                0::float8 AS debit
         FROM payments pay
         LEFT JOIN tenants t ON pay.tenant_id = t.id
         JOIN properties prop ON pay.property_id = prop.id
         WHERE prop.landlord_id = ",
    );
    query.push_bind(landlord_id);
    push_date_range(&mut query, "pay.payment_date", filter);
    if let Some(needle) = like_pattern(filter) {
        query
            .push(" AND (LOWER(COALESCE(t.full_name, '')) LIKE ")
            .push_bind(needle.clone())
            .push(" OR LOWER(COALESCE(pay.description, '')) LIKE ")
            .push_bind(needle.clone())
            .push(" OR LOWER(prop.title) LIKE ")
            .push_bind(needle)
            .push(")");
    }
    query.push(" ORDER BY pay.payment_date ASC, pay.created_at ASC, pay.id ASC");

    query
        .build_query_as::<StatementRow>()
        .fetch_all(pool)
        .await
        .map_err(map_db_error)
}

/// Manual ledger lines for one landlord; the free-text filter matches the
/// narration only, since these rows carry no tenant or property.
pub async fn ledger_statement_rows(
    pool: &PgPool,
    landlord_id: i64,
    filter: &StatementQuery,
) -> AppResult<Vec<StatementRow>> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT lt.entry_date,
                lt.created_at,
                lt.narration AS narration,
                lt.payment_method,
                NULL::text AS tenant_name,
                NULL::text AS property_title,
                CASE WHEN lt.entry_type = 'credit' THEN lt.amount ELSE 0 END AS credit,
                CASE WHEN lt.entry_type = 'debit' THEN lt.amount ELSE 0 END AS debit
         FROM landlord_transactions lt
         WHERE lt.landlord_id = ",
    );
    query.push_bind(landlord_id);
    push_date_range(&mut query, "lt.entry_date", filter);
    if let Some(needle) = like_pattern(filter) {
        query.push(" AND LOWER(lt.narration) LIKE ").push_bind(needle);
    }
    query.push(" ORDER BY lt.entry_date ASC, lt.created_at ASC, lt.id ASC");

    query
        .build_query_as::<StatementRow>()
        .fetch_all(pool)
        .await
        .map_err(map_db_error)
}

pub async fn list_entries(
    pool: &PgPool,
    landlord_id: i64,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<LedgerEntry>> {
    sqlx::query_as::<_, LedgerEntry>(
        "SELECT * FROM landlord_transactions
         WHERE landlord_id = $1
         ORDER BY entry_date ASC, created_at ASC, id ASC
         LIMIT $2 OFFSET $3",
    )
    .bind(landlord_id)
    .bind(limit)
    .bind(offset.max(0))
    .fetch_all(pool)
    .await
    .map_err(map_db_error)
}

/// Dashboard aggregate: Σ payment amounts + Σ manual credits − Σ manual
/// debits across every landlord.
pub async fn general_balance(pool: &PgPool) -> AppResult<f64> {
    sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE((SELECT SUM(amount) FROM payments), 0)
              + COALESCE((SELECT SUM(CASE WHEN entry_type = 'credit' THEN amount
                                          ELSE -amount END)
                          FROM landlord_transactions), 0)",
    )
    .fetch_one(pool)
    .await
    .map_err(map_db_error)
}

/// Total unpaid rent across all tenants.
pub async fn outstanding_total(pool: &PgPool) -> AppResult<f64> {
    sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(SUM(balance_due), 0) FROM payments WHERE balance_due > 0",
    )
    .fetch_one(pool)
    .await
    .map_err(map_db_error)
}

fn push_date_range(query: &mut QueryBuilder<'_, Postgres>, column: &str, filter: &StatementQuery) {
    if let Some(start) = filter.start_date {
        query.push(format!(" AND {column} >= ")).push_bind(start);
    }
    if let Some(end) = filter.end_date {
        query.push(format!(" AND {column} <= ")).push_bind(end);
    }
}

fn like_pattern(filter: &StatementQuery) -> Option<String> {
    filter
        .q
        .as_deref()
        .map(str::trim)
        .filter(|needle| !needle.is_empty())
        .map(|needle| format!("%{}%", needle.to_lowercase()))
}
