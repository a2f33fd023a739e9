//! JSON REST handlers for zones.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use shadehub_app::ports::{EnergyStrategy, EventPublisher, MotionTimer};
use shadehub_domain::id::ZoneId;
use shadehub_domain::zone::Zone;

use crate::api::devices::PositionRequest;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct GroupBody {
    pub success: bool,
    pub zone_id: ZoneId,
    pub devices_affected: usize,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Zone>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the position endpoint.
pub enum PositionResponse {
    Ok(Json<GroupBody>),
}

impl IntoResponse for PositionResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/zones`
pub async fn list<P, E, T>(State(state): State<AppState<P, E, T>>) -> ListResponse
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    let zones: Vec<Zone> = state
        .controller
        .read(|home| home.zones.values().cloned().collect());
    ListResponse::Ok(Json(zones))
}

/// `POST /api/zones/{id}/position`
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
        .set_group_position(&ZoneId::new(id), req.position, req.tilt)
        .await?;
    Ok(PositionResponse::Ok(Json(GroupBody {
        success: true,
        zone_id: result.zone_id,
        devices_affected: result.devices_affected,
    })))
}
