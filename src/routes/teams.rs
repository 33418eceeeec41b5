use axum::{
    Json, Router,
    extract::{Path, State, rejection::PathRejection},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::{
        common::ApiResponse,
        tournament::{ScoreSummary, TeamDrivesResponse, TeamMulligansResponse, TeamSummary},
    },
    error::AppError,
    routes::team_id,
    services::tournament_service,
    state::SharedState,
};

/// Public read-only team routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/teams/{id}", get(get_team))
        .route("/api/teams/{id}/scores", get(get_team_scores))
        .route("/api/teams/{id}/drives", get(get_team_drives))
        .route("/api/teams/{id}/mulligans", get(get_team_mulligans))
}

/// Team with its roster.
#[utoipa::path(
    get,
    path = "/api/teams/{id}",
    tag = "teams",
    params(("id" = String, Path, description = "Team identifier")),
    responses(
        (status = 200, description = "Team with roster", body = TeamSummary),
        (status = 404, description = "Unknown team")
    )
)]
pub async fn get_team(
    State(state): State<SharedState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<TeamSummary>>, AppError> {
    let team = tournament_service::get_team(&state, team_id(path)?).await?;
    Ok(Json(ApiResponse::ok(team)))
}

/// Scores of a team, ordered by hole.
#[utoipa::path(
    get,
    path = "/api/teams/{id}/scores",
    tag = "teams",
    params(("id" = String, Path, description = "Team identifier")),
    responses((status = 200, description = "Scores ordered by hole", body = [ScoreSummary]))
)]
pub async fn get_team_scores(
    State(state): State<SharedState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<Vec<ScoreSummary>>>, AppError> {
    let scores = tournament_service::get_team_scores(&state, team_id(path)?).await?;
    Ok(Json(ApiResponse::ok(scores)))
}

/// Drives per rostered player and whether the minimum is met.
#[utoipa::path(
    get,
    path = "/api/teams/{id}/drives",
    tag = "teams",
    params(("id" = String, Path, description = "Team identifier")),
    responses((status = 200, description = "Drives per roster player", body = TeamDrivesResponse))
)]
pub async fn get_team_drives(
    State(state): State<SharedState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<TeamDrivesResponse>>, AppError> {
    let drives = tournament_service::get_team_drive_counts(&state, team_id(path)?).await?;
    Ok(Json(ApiResponse::ok(drives)))
}

/// Mulligans used and remaining per rostered player.
#[utoipa::path(
    get,
    path = "/api/teams/{id}/mulligans",
    tag = "teams",
    params(("id" = String, Path, description = "Team identifier")),
    responses(
        (status = 200, description = "Mulligans per roster player", body = TeamMulligansResponse)
    )
)]
pub async fn get_team_mulligans(
    State(state): State<SharedState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<TeamMulligansResponse>>, AppError> {
    let mulligans = tournament_service::get_team_mulligan_counts(&state, team_id(path)?).await?;
    Ok(Json(ApiResponse::ok(mulligans)))
}
