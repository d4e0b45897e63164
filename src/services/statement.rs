use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppResult;
use crate::repository::ledger as store;
use crate::repository::ledger::StatementRow;
use crate::repository::registry;
use crate::schemas::StatementQuery;
use crate::services::ledger::round2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineSource {
    Payment,
    Manual,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatementLine {
    pub sn: usize,
    pub date: NaiveDate,
    pub narration: String,
    pub payment_method: String,
    pub tenant_name: Option<String>,
    pub property_title: Option<String>,
    pub credit: f64,
    pub debit: f64,
    pub balance: f64,
    pub source: LineSource,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statement {
    pub landlord_id: i64,
    pub landlord_name: String,
    pub lines: Vec<StatementLine>,
    pub balance: f64,
}

/// A normalized source line awaiting merge. `created_at` is the stable
/// tie-break for entries sharing a date.
#[derive(Debug, Clone)]
pub(crate) struct SourceLine {
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub narration: String,
    pub payment_method: String,
    pub tenant_name: Option<String>,
    pub property_title: Option<String>,
    pub credit: f64,
    pub debit: f64,
    pub source: LineSource,
}

/// Merge payment-derived and manual lines into one chronological,
/// numbered sequence with a running balance. The balance is recomputed
/// from exactly the rows given, so a filtered view balances over the
/// filtered rows only.
pub(crate) fn merge_lines(mut rows: Vec<SourceLine>) -> (Vec<StatementLine>, f64) {
    rows.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });

    let mut balance = 0.0;
    let lines = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            balance = round2(balance + row.credit - row.debit);
            StatementLine {
                sn: index + 1,
                date: row.date,
                narration: row.narration,
                payment_method: row.payment_method,
                tenant_name: row.tenant_name,
                property_title: row.property_title,
                credit: row.credit,
                debit: row.debit,
                balance,
                source: row.source,
            }
        })
        .collect();
    (lines, balance)
}

fn payment_line(row: StatementRow) -> SourceLine {
    let narration = row
        .narration
        .clone()
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| {
            format!(
                "Payment from {}",
                row.tenant_name.as_deref().unwrap_or("unknown tenant")
            )
        });
    SourceLine {
        date: row.entry_date,
        created_at: row.created_at,
        narration,
        payment_method: row.payment_method,
        tenant_name: row.tenant_name,
        property_title: row.property_title,
        credit: row.credit,
        debit: row.debit,
        source: LineSource::Payment,
    }
}

fn manual_line(row: StatementRow) -> SourceLine {
    SourceLine {
        date: row.entry_date,
        created_at: row.created_at,
        narration: row.narration.unwrap_or_default(),
        payment_method: row.payment_method,
        tenant_name: None,
        property_title: None,
        credit: row.credit,
        debit: row.debit,
        source: LineSource::Manual,
    }
}

/// Build the chronological account statement for one landlord: every
/// tenant payment against the landlord's properties shown as a credit in
/// full, merged with the manual ledger entries.
pub async fn build_statement(
    pool: &PgPool,
    landlord_id: i64,
    filter: &StatementQuery,
) -> AppResult<Statement> {
    let landlord = registry::get_landlord(pool, landlord_id).await?;

    let payments = store::payment_statement_rows(pool, landlord_id, filter).await?;
    let manual = store::ledger_statement_rows(pool, landlord_id, filter).await?;

    let mut rows = Vec::with_capacity(payments.len() + manual.len());
    rows.extend(payments.into_iter().map(payment_line));
    rows.extend(manual.into_iter().map(manual_line));

    let (lines, balance) = merge_lines(rows);
    Ok(Statement {
        landlord_id: landlord.id,
        landlord_name: landlord.full_name,
        lines,
        balance,
    })
}

/// Σ payment amounts + Σ manual credits − Σ manual debits across all
/// landlords, for the dashboard aggregate.
pub async fn general_balance_all_landlords(pool: &PgPool) -> AppResult<f64> {
    let balance = store::general_balance(pool).await?;
    Ok(round2(balance))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{merge_lines, LineSource, SourceLine};

    fn line(date: &str, seq: u32, credit: f64, debit: f64) -> SourceLine {
        SourceLine {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, seq).unwrap(),
            narration: format!("line {seq}"),
            payment_method: "transfer".to_string(),
            tenant_name: None,
            property_title: None,
            credit,
            debit,
            source: LineSource::Manual,
        }
    }

    #[test]
    fn orders_by_date_then_creation() {
        let rows = vec![
            line("2026-03-10", 2, 100.0, 0.0),
            line("2026-02-01", 1, 500.0, 0.0),
            line("2026-03-10", 1, 0.0, 50.0),
        ];
        let (lines, balance) = merge_lines(rows);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].narration, "line 1");
        assert_eq!(lines[1].debit, 50.0);
        assert_eq!(lines[2].credit, 100.0);
        assert_eq!(lines[0].sn, 1);
        assert_eq!(lines[2].sn, 3);
        assert_eq!(balance, 550.0);
    }

    #[test]
    fn running_balance_accumulates_credit_minus_debit() {
        let rows = vec![
            line("2026-01-05", 1, 1500.0, 0.0),
            line("2026-01-20", 2, 0.0, 150.0),
            line("2026-02-03", 3, 750.0, 0.0),
        ];
        let (lines, balance) = merge_lines(rows);
        assert_eq!(lines[0].balance, 1500.0);
        assert_eq!(lines[1].balance, 1350.0);
        assert_eq!(lines[2].balance, 2100.0);
        assert_eq!(balance, 2100.0);
    }

    #[test]
    fn same_date_ordering_does_not_change_final_balance() {
        let forward = vec![
            line("2026-04-01", 1, 900.0, 0.0),
            line("2026-04-01", 2, 0.0, 90.0),
            line("2026-04-01", 3, 300.0, 0.0),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let (_, balance_a) = merge_lines(forward);
        let (_, balance_b) = merge_lines(reversed);
        assert_eq!(balance_a, balance_b);
        assert_eq!(balance_a, 1110.0);
    }

    #[test]
    fn empty_statement_balances_to_zero() {
        let (lines, balance) = merge_lines(Vec::new());
        assert!(lines.is_empty());
        assert_eq!(balance, 0.0);
    }
}
