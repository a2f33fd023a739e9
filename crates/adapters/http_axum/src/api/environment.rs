//! Outside inputs: weather, occupancy, light level and season override.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use shadehub_app::ports::{EnergyStrategy, EventPublisher, MotionTimer};
use shadehub_domain::error::ValidationError;
use shadehub_domain::id::{DeviceId, RoomId};
use shadehub_domain::occupancy::OccupancyReading;
use shadehub_domain::time::{Season, Timestamp, now};
use shadehub_domain::weather::{Hazard, WeatherReading, WeatherState};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct OccupancyRequest {
    pub room: String,
    pub occupied: bool,
    pub timestamp: Option<Timestamp>,
}

#[derive(Deserialize)]
pub struct LightRequest {
    pub lux: Option<f64>,
}

#[derive(Deserialize)]
pub struct SeasonRequest {
    pub season: Option<Season>,
}

#[derive(Serialize)]
pub struct WeatherBody {
    #[serde(flatten)]
    pub weather: WeatherState,
    pub hazards: Vec<Hazard>,
}

#[derive(Serialize)]
pub struct WeatherUpdateBody {
    pub success: bool,
    pub hazards: Vec<Hazard>,
    pub secured: Vec<DeviceId>,
}

#[derive(Serialize)]
pub struct AckBody {
    pub success: bool,
}

/// Possible responses from the weather read endpoint.
pub enum WeatherResponse {
    Ok(Json<WeatherBody>),
}

impl IntoResponse for WeatherResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the weather push endpoint.
pub enum WeatherUpdateResponse {
    Ok(Json<WeatherUpdateBody>),
}

impl IntoResponse for WeatherUpdateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the occupancy, light and season endpoints.
pub enum AckResponse {
    Ok(Json<AckBody>),
}

impl AckResponse {
    fn ok() -> Self {
        Self::Ok(Json(AckBody { success: true }))
    }
}

impl IntoResponse for AckResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/weather`
pub async fn weather<P, E, T>(State(state): State<AppState<P, E, T>>) -> WeatherResponse
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    let snapshot = state.controller.weather();
    WeatherResponse::Ok(Json(WeatherBody {
        weather: snapshot.weather,
        hazards: snapshot.hazards,
    }))
}

/// `POST /api/weather`
///
/// Stores the reading and runs the safety interlock right away.
pub async fn update_weather<P, E, T>(
    State(state): State<AppState<P, E, T>>,
    payload: Result<Json<WeatherReading>, JsonRejection>,
) -> Result<WeatherUpdateResponse, ApiError>
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    let Json(reading) = payload?;
    reading.validate()?;
    let report = state.controller.update_weather(reading).await;
    Ok(WeatherUpdateResponse::Ok(Json(WeatherUpdateBody {
        success: true,
        hazards: report.hazards,
        secured: report.secured,
    })))
}

/// `POST /api/occupancy`
pub async fn update_occupancy<P, E, T>(
    State(state): State<AppState<P, E, T>>,
    payload: Result<Json<OccupancyRequest>, JsonRejection>,
) -> Result<AckResponse, ApiError>
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    let Json(req) = payload?;
    if req.room.trim().is_empty() {
        return Err(ValidationError::EmptyName.into());
    }
    state.controller.update_occupancy(OccupancyReading::new(
        RoomId::new(req.room),
        req.occupied,
        req.timestamp.unwrap_or_else(now),
    ));
    Ok(AckResponse::ok())
}

/// `POST /api/light`
///
/// A missing `lux` goes back to estimating light from the sun elevation.
pub async fn set_light<P, E, T>(
    State(state): State<AppState<P, E, T>>,
    payload: Result<Json<LightRequest>, JsonRejection>,
) -> Result<AckResponse, ApiError>
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    let Json(req) = payload?;
    if req.lux.is_some_and(|lux| !lux.is_finite() || lux < 0.0) {
        return Err(ValidationError::InvalidReading("lux").into());
    }
    state.controller.set_lux(req.lux);
    Ok(AckResponse::ok())
}

/// `PUT /api/season`
pub async fn set_season<P, E, T>(
    State(state): State<AppState<P, E, T>>,
    payload: Result<Json<SeasonRequest>, JsonRejection>,
) -> Result<AckResponse, ApiError>
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    let Json(req) = payload?;
    state.controller.set_season(req.season);
    Ok(AckResponse::ok())
}
