use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::{
        common::ApiResponse,
        leaderboard::LeaderboardResponse,
        tournament::{TeamSummary, TournamentSummary},
    },
    error::AppError,
    routes::tournament_type,
    services::{leaderboard, tournament_service},
    state::SharedState,
};

/// Public read-only tournament routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/tournaments", get(list_tournaments))
        .route("/api/tournaments/{type}", get(get_tournament))
        .route("/api/tournaments/{type}/teams", get(list_teams))
        .route("/api/tournaments/{type}/leaderboard", get(get_leaderboard))
}

/// Every configured tournament.
#[utoipa::path(
    get,
    path = "/api/tournaments",
    tag = "tournaments",
    responses((status = 200, description = "Configured tournaments", body = [TournamentSummary]))
)]
pub async fn list_tournaments(
    State(state): State<SharedState>,
) -> Result<Json<ApiResponse<Vec<TournamentSummary>>>, AppError> {
    let tournaments = tournament_service::list_tournaments(&state).await?;
    Ok(Json(ApiResponse::ok(tournaments)))
}

/// One tournament with its course pars.
#[utoipa::path(
    get,
    path = "/api/tournaments/{type}",
    tag = "tournaments",
    params(("type" = String, Path, description = "`2-man` or `4-man`")),
    responses(
        (status = 200, description = "Tournament", body = TournamentSummary),
        (status = 404, description = "Unknown tournament")
    )
)]
pub async fn get_tournament(
    State(state): State<SharedState>,
    Path(raw): Path<String>,
) -> Result<Json<ApiResponse<TournamentSummary>>, AppError> {
    let tournament = tournament_service::get_tournament(&state, tournament_type(&raw)?).await?;
    Ok(Json(ApiResponse::ok(tournament)))
}

/// Teams of a tournament with their rosters.
#[utoipa::path(
    get,
    path = "/api/tournaments/{type}/teams",
    tag = "tournaments",
    params(("type" = String, Path, description = "`2-man` or `4-man`")),
    responses((status = 200, description = "Teams with rosters", body = [TeamSummary]))
)]
pub async fn list_teams(
    State(state): State<SharedState>,
    Path(raw): Path<String>,
) -> Result<Json<ApiResponse<Vec<TeamSummary>>>, AppError> {
    let teams = tournament_service::list_teams(&state, tournament_type(&raw)?).await?;
    Ok(Json(ApiResponse::ok(teams)))
}

/// Ranked standings of every team of a tournament.
#[utoipa::path(
    get,
    path = "/api/tournaments/{type}/leaderboard",
    tag = "tournaments",
    params(("type" = String, Path, description = "`2-man` or `4-man`")),
    responses(
        (status = 200, description = "Leaderboard", body = LeaderboardResponse),
        (status = 404, description = "Unknown tournament")
    )
)]
pub async fn get_leaderboard(
    State(state): State<SharedState>,
    Path(raw): Path<String>,
) -> Result<Json<ApiResponse<LeaderboardResponse>>, AppError> {
    let board = leaderboard::get_leaderboard(&state, tournament_type(&raw)?).await?;
    Ok(Json(ApiResponse::ok(board)))
}
