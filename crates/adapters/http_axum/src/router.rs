//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use shadehub_app::ports::{EnergyStrategy, EventPublisher, MotionTimer};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// API routes live under `/api`. Includes a [`TraceLayer`] that logs each
/// HTTP request/response at the `DEBUG` level.
pub fn build<P, E, T>(state: AppState<P, E, T>) -> Router
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
