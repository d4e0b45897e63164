use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::repository::{ledger as ledger_store, registry};
use crate::services::statement;
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/reports/dashboard", axum::routing::get(dashboard))
}

/// Back-office dashboard aggregate: entity and occupancy counts, total
/// unpaid rent, and the general balance across all landlords.
async fn dashboard(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let counts = registry::entity_counts(&state.db_pool).await?;
    let outstanding_rent_total = ledger_store::outstanding_total(&state.db_pool).await?;
    let general_balance = statement::general_balance_all_landlords(&state.db_pool).await?;

    Ok(Json(json!({
        "counts": counts,
        "outstanding_rent_total": outstanding_rent_total,
        "general_balance": general_balance,
    })))
}
