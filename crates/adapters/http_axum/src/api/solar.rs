//! Current ephemeris.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use shadehub_app::ports::{EnergyStrategy, EventPublisher, MotionTimer};
use shadehub_domain::solar::{FacingExposure, SolarState};
use shadehub_domain::time::Season;

use crate::state::AppState;

#[derive(Serialize)]
pub struct SolarBody {
    #[serde(flatten)]
    pub solar: SolarState,
    pub exposure: Vec<FacingExposure>,
    pub season: Season,
}

/// Possible responses from the solar endpoint.
pub enum GetResponse {
    Ok(Json<SolarBody>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/solar`
pub async fn get<P, E, T>(State(state): State<AppState<P, E, T>>) -> GetResponse
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    let snapshot = state.controller.solar_data();
    GetResponse::Ok(Json(SolarBody {
        solar: snapshot.solar,
        exposure: snapshot.exposure,
        season: snapshot.season,
    }))
}
