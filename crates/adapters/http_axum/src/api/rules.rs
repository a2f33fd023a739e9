//! JSON REST handlers for automation rules.

use std::str::FromStr;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use shadehub_app::ports::{EnergyStrategy, EventPublisher, MotionTimer};
use shadehub_domain::automation::{
    AutomationRule, Comparison, RuleAction, RuleTrigger, TargetSelector,
};
use shadehub_domain::error::NotFoundError;
use shadehub_domain::id::RuleId;
use shadehub_domain::time::Season;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for creating a rule.
#[derive(Deserialize)]
pub struct CreateRuleRequest {
    pub name: String,
    pub enabled: Option<bool>,
    pub trigger: RuleTrigger,
    pub comparison: Comparison,
    #[serde(default)]
    pub threshold: f64,
    pub target: TargetSelector,
    pub action: RuleAction,
    pub cooldown_minutes: Option<u32>,
    pub season: Option<Season>,
}

#[derive(Serialize)]
pub struct CreatedBody {
    pub success: bool,
    pub rule_id: RuleId,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<AutomationRule>>),
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

/// `GET /api/rules`
pub async fn list<P, E, T>(State(state): State<AppState<P, E, T>>) -> ListResponse
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    ListResponse::Ok(Json(state.controller.rules()))
}

/// `POST /api/rules`
pub async fn create<P, E, T>(
    State(state): State<AppState<P, E, T>>,
    payload: Result<Json<CreateRuleRequest>, JsonRejection>,
) -> Result<CreateResponse, ApiError>
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    let Json(req) = payload?;
    let mut builder = AutomationRule::builder()
        .name(req.name)
        .when(req.trigger, req.comparison, req.threshold)
        .target(req.target)
        .action(req.action);
    if let Some(enabled) = req.enabled {
        builder = builder.enabled(enabled);
    }
    if let Some(minutes) = req.cooldown_minutes {
        builder = builder.cooldown_minutes(minutes);
    }
    if let Some(season) = req.season {
        builder = builder.season(season);
    }
    let rule_id = state.controller.add_rule(builder.build()?)?;
    Ok(CreateResponse::Created(Json(CreatedBody {
        success: true,
        rule_id,
    })))
}

/// `DELETE /api/rules/{id}`
pub async fn delete<P, E, T>(
    State(state): State<AppState<P, E, T>>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError>
where
    P: EventPublisher + Send + Sync + 'static,
    E: EnergyStrategy + Send + Sync + 'static,
    T: MotionTimer + Send + Sync + 'static,
{
    let rule_id = RuleId::from_str(&id).map_err(|_| NotFoundError {
        entity: "Rule",
        id: id.clone(),
    })?;
    state.controller.remove_rule(rule_id)?;
    Ok(DeleteResponse::NoContent)
}
