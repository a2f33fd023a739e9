//! Movement statistics and the position log.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use shadehub_app::ports::{EnergyStrategy, EventPublisher, MotionTimer};
use shadehub_domain::id::RoomId;
use shadehub_domain::statistics::{DeviceStatistics, PositionLogEntry};

use crate::state::AppState;

const DEFAULT_MOVES_LIMIT: usize = 50;

#[derive(Deserialize)]
pub struct StatisticsQuery {
    pub room: Option<String>,
}

#[derive(Deserialize)]
pub struct MovesQuery {
    pub limit: Option<usize>,
}

/// Possible responses from the statistics endpoint.
pub enum ListResponse {
    Ok(Json<Vec<DeviceStatistics>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the moves endpoint.
pub enum MovesResponse {
    Ok(Json<Vec<PositionLogEntry>>),
}

impl IntoResponse for MovesResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/statistics?room=`
pub async fn list<P, E, T>(
    State(state): State<AppState<P, E, T>>,
    Query(query): Query<StatisticsQuery>,
) -> ListResponse
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    let room = query.room.map(RoomId::new);
    ListResponse::Ok(Json(state.controller.statistics(room.as_ref())))
}

/// `GET /api/moves?limit=`
pub async fn moves<P, E, T>(
    State(state): State<AppState<P, E, T>>,
    Query(query): Query<MovesQuery>,
) -> MovesResponse
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_MOVES_LIMIT);
    MovesResponse::Ok(Json(state.controller.recent_moves(limit)))
}
