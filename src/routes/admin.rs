use axum::{
    Json, Router,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::post,
};
use validator::Validate;

use crate::{
    dto::{
        admin::{CreatePlayerRequest, CreateTeamRequest},
        common::ApiResponse,
        tournament::{PlayerSummary, TeamSummary},
    },
    error::AppError,
    services::admin_service,
    state::SharedState,
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admin-only registration endpoints.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/api/admin/players", post(create_player))
        .route("/api/admin/teams", post(create_team))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Unwrap a JSON body and run its field validators.
fn validated<T: Validate>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    let Json(body) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    body.validate()?;
    Ok(body)
}

/// Register a player that can later be rostered on teams.
#[utoipa::path(
    post,
    path = "/api/admin/players",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Token configured through ADMIN_TOKEN")),
    request_body = CreatePlayerRequest,
    responses(
        (status = 200, description = "Player created", body = PlayerSummary),
        (status = 401, description = "Missing or invalid admin token")
    )
)]
pub async fn create_player(
    State(state): State<SharedState>,
    payload: Result<Json<CreatePlayerRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<PlayerSummary>>, AppError> {
    let request = validated(payload)?;
    let player = admin_service::create_player(&state, request).await?;
    Ok(Json(ApiResponse::ok(player)))
}

/// Register a team with its full roster.
#[utoipa::path(
    post,
    path = "/api/admin/teams",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Token configured through ADMIN_TOKEN")),
    request_body = CreateTeamRequest,
    responses(
        (status = 200, description = "Team created", body = TeamSummary),
        (status = 400, description = "Roster does not fit the tournament"),
        (status = 401, description = "Missing or invalid admin token")
    )
)]
pub async fn create_team(
    State(state): State<SharedState>,
    payload: Result<Json<CreateTeamRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<TeamSummary>>, AppError> {
    let request = validated(payload)?;
    let team = admin_service::create_team(&state, request).await?;
    Ok(Json(ApiResponse::ok(team)))
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.admin_token() else {
        return Err(AppError::Unauthorized(
            "admin routes are disabled: no admin token configured".into(),
        ));
    };

    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    if provided != expected {
        return Err(AppError::Unauthorized("invalid admin token".into()));
    }
    Ok(next.run(req).await)
}
