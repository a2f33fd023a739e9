//! JSON REST handlers for devices.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use shadehub_app::actuator::Actuation;
use shadehub_app::ports::{EnergyStrategy, EventPublisher, MotionTimer};
use shadehub_domain::device::Device;
use shadehub_domain::id::DeviceId;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for moving a device or a zone.
#[derive(Deserialize)]
pub struct PositionRequest {
    pub position: i32,
    pub tilt: Option<i32>,
}

/// Request body for changing device availability.
#[derive(Deserialize)]
pub struct OnlineRequest {
    pub online: bool,
}

#[derive(Serialize)]
pub struct PositionBody {
    pub success: bool,
    pub device_id: DeviceId,
    pub position: u8,
    pub tilt: u8,
    /// `moved`, `unchanged`, `offline` or `busy`.
    pub outcome: &'static str,
}

#[derive(Serialize)]
pub struct CalibrationBody {
    pub success: bool,
    pub device_id: DeviceId,
    pub outcome: &'static str,
}

fn outcome(actuation: Actuation) -> &'static str {
    match actuation {
        Actuation::Moved { .. } => "moved",
        Actuation::Unchanged => "unchanged",
        Actuation::Offline => "offline",
        Actuation::Busy => "busy",
        Actuation::CalibrationStarted => "calibrating",
    }
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Device>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get and online endpoints.
pub enum GetResponse {
    Ok(Json<Device>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the position endpoint.
pub enum PositionResponse {
    Ok(Json<PositionBody>),
}

impl IntoResponse for PositionResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the calibrate endpoint.
pub enum CalibrateResponse {
    Accepted(Json<CalibrationBody>),
}

impl IntoResponse for CalibrateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Accepted(json) => (StatusCode::ACCEPTED, json).into_response(),
        }
    }
}

/// `GET /api/devices`
pub async fn list<P, E, T>(State(state): State<AppState<P, E, T>>) -> ListResponse
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    ListResponse::Ok(Json(state.controller.devices()))
}

/// `GET /api/devices/{id}`
pub async fn get<P, E, T>(
    State(state): State<AppState<P, E, T>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    let device = state.controller.device(&DeviceId::new(id))?;
    Ok(GetResponse::Ok(Json(device)))
}

/// `POST /api/devices/{id}/position`
pub async fn set_position<P, E, T>(
    State(state): State<AppState<P, E, T>>,
    Path(id): Path<String>,
    payload: Result<Json<PositionRequest>, JsonRejection>,
) -> Result<PositionResponse, ApiError>
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    let Json(req) = payload?;
    let result = state
        .controller
        .set_position(&DeviceId::new(id), req.position, req.tilt)
        .await?;
    Ok(PositionResponse::Ok(Json(PositionBody {
        success: true,
        outcome: outcome(result.actuation),
        device_id: result.device_id,
        position: result.position,
        tilt: result.tilt,
    })))
}

/// `POST /api/devices/{id}/calibrate`
pub async fn calibrate<P, E, T>(
    State(state): State<AppState<P, E, T>>,
    Path(id): Path<String>,
) -> Result<CalibrateResponse, ApiError>
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    let device_id = DeviceId::new(id);
    let actuation = state.controller.calibrate(&device_id).await?;
    Ok(CalibrateResponse::Accepted(Json(CalibrationBody {
        success: true,
        device_id,
        outcome: outcome(actuation),
    })))
}

/// `PUT /api/devices/{id}/online`
pub async fn set_online<P, E, T>(
    State(state): State<AppState<P, E, T>>,
    Path(id): Path<String>,
    payload: Result<Json<OnlineRequest>, JsonRejection>,
) -> Result<GetResponse, ApiError>
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    let Json(req) = payload?;
    let device = state
        .controller
        .set_device_online(&DeviceId::new(id), req.online)?;
    Ok(GetResponse::Ok(Json(device)))
}
