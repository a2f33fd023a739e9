//! JSON REST handlers for schedules.

use std::str::FromStr;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use shadehub_app::ports::{EnergyStrategy, EventPublisher, MotionTimer};
use shadehub_domain::error::NotFoundError;
use shadehub_domain::id::ScheduleId;
use shadehub_domain::schedule::{Schedule, ScheduleAction, ScheduleTrigger};
use shadehub_domain::time::WeekdaySet;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for creating a schedule.
#[derive(Deserialize)]
pub struct CreateScheduleRequest {
    pub name: String,
    pub enabled: Option<bool>,
    pub weekdays: Option<WeekdaySet>,
    pub trigger: ScheduleTrigger,
    pub actions: Vec<ScheduleAction>,
}

#[derive(Serialize)]
pub struct CreatedBody {
    pub success: bool,
    pub schedule_id: ScheduleId,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Schedule>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<CreatedBody>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the delete endpoint.
pub enum DeleteResponse {
    NoContent,
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `GET /api/schedules`
pub async fn list<P, E, T>(State(state): State<AppState<P, E, T>>) -> ListResponse
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    ListResponse::Ok(Json(state.controller.schedules()))
}

/// `POST /api/schedules`
pub async fn create<P, E, T>(
    State(state): State<AppState<P, E, T>>,
    payload: Result<Json<CreateScheduleRequest>, JsonRejection>,
) -> Result<CreateResponse, ApiError>
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    let Json(req) = payload?;
    let mut builder = Schedule::builder().name(req.name).trigger(req.trigger);
    if let Some(enabled) = req.enabled {
        builder = builder.enabled(enabled);
    }
    if let Some(weekdays) = req.weekdays {
        builder = builder.weekdays(weekdays);
    }
    for action in req.actions {
        builder = builder.action(action);
    }
    let schedule_id = state.controller.add_schedule(builder.build()?)?;
    Ok(CreateResponse::Created(Json(CreatedBody {
        success: true,
        schedule_id,
    })))
}

/// `DELETE /api/schedules/{id}`
pub async fn delete<P, E, T>(
    State(state): State<AppState<P, E, T>>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError>
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    let schedule_id = ScheduleId::from_str(&id).map_err(|_| NotFoundError {
        entity: "Schedule",
        id: id.clone(),
    })?;
    state.controller.remove_schedule(schedule_id)?;
    Ok(DeleteResponse::NoContent)
}
