//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod devices;
#[allow(clippy::missing_errors_doc)]
pub mod environment;
#[allow(clippy::missing_errors_doc)]
pub mod rules;
#[allow(clippy::missing_errors_doc)]
pub mod schedules;
pub mod solar;
pub mod statistics;
#[allow(clippy::missing_errors_doc)]
pub mod zones;

use axum::Router;
use axum::routing::{delete, get, post, put};

use shadehub_app::ports::{EnergyStrategy, EventPublisher, MotionTimer};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<P, E, T>() -> Router<AppState<P, E, T>>
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    Router::new()
        // Devices
        .route("/devices", get(devices::list::<P, E, T>))
        .route("/devices/{id}", get(devices::get::<P, E, T>))
        .route(
            "/devices/{id}/position",
            post(devices::set_position::<P, E, T>),
        )
        .route(
            "/devices/{id}/calibrate",
            post(devices::calibrate::<P, E, T>),
        )
        .route("/devices/{id}/online", put(devices::set_online::<P, E, T>))
        // Zones
        .route("/zones", get(zones::list::<P, E, T>))
        .route("/zones/{id}/position", post(zones::set_position::<P, E, T>))
        // Schedules
        .route(
            "/schedules",
            get(schedules::list::<P, E, T>).post(schedules::create::<P, E, T>),
        )
        .route("/schedules/{id}", delete(schedules::delete::<P, E, T>))
        // Rules
        .route(
            "/rules",
            get(rules::list::<P, E, T>).post(rules::create::<P, E, T>),
        )
        .route("/rules/{id}", delete(rules::delete::<P, E, T>))
        // Ephemeris and statistics
        .route("/solar", get(solar::get::<P, E, T>))
        .route("/statistics", get(statistics::list::<P, E, T>))
        .route("/moves", get(statistics::moves::<P, E, T>))
        // Environment
        .route(
            "/weather",
            get(environment::weather::<P, E, T>).post(environment::update_weather::<P, E, T>),
        )
        .route(
            "/occupancy",
            post(environment::update_occupancy::<P, E, T>),
        )
        .route("/light", post(environment::set_light::<P, E, T>))
        .route("/season", put(environment::set_season::<P, E, T>))
}
