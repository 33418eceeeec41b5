use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the scramble board API.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::scores::submit_score,
        crate::routes::tournaments::list_tournaments,
        crate::routes::tournaments::get_tournament,
        crate::routes::tournaments::list_teams,
        crate::routes::tournaments::get_leaderboard,
        crate::routes::teams::get_team,
        crate::routes::teams::get_team_scores,
        crate::routes::teams::get_team_drives,
        crate::routes::teams::get_team_mulligans,
        crate::routes::admin::create_player,
        crate::routes::admin::create_team,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::score::SubmitScoreRequest,
            crate::dto::score::HoleScoreInput,
            crate::dto::score::SubmittedScores,
            crate::dto::tournament::TournamentSummary,
            crate::dto::tournament::TeamSummary,
            crate::dto::tournament::PlayerSummary,
            crate::dto::tournament::ScoreSummary,
            crate::dto::tournament::DriveCountSummary,
            crate::dto::tournament::MulliganCountSummary,
            crate::dto::tournament::TeamDrivesResponse,
            crate::dto::tournament::TeamMulligansResponse,
            crate::dto::leaderboard::LeaderboardEntry,
            crate::dto::leaderboard::LeaderboardResponse,
            crate::dto::admin::CreatePlayerRequest,
            crate::dto::admin::CreateTeamRequest,
            crate::dao::models::TournamentType,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "scores", description = "Score submission"),
        (name = "tournaments", description = "Tournaments, teams and leaderboards"),
        (name = "teams", description = "Per-team scores and tallies"),
        (name = "admin", description = "Player and team registration"),
    )
)]
/// OpenAPI document of the HTTP API.
pub struct ApiDoc;
