use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub mod health;
pub mod landlords;
pub mod payments;
pub mod properties;
pub mod reports;
pub mod tenants;

pub fn v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .merge(landlords::router())
        .merge(properties::router())
        .merge(tenants::router())
        .merge(payments::router())
        .merge(reports::router())
}
