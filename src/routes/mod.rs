use axum::{
    Router,
    extract::{Path, rejection::PathRejection},
};
use uuid::Uuid;

use crate::{dao::models::TournamentType, error::AppError, state::SharedState};

/// Player and team registration, behind the admin token.
pub mod admin;
/// Swagger UI.
pub mod docs;
/// Health probe.
pub mod health;
/// Score submission.
pub mod scores;
/// Per-team views.
pub mod teams;
/// Tournament views and the leaderboard.
pub mod tournaments;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(scores::router())
        .merge(tournaments::router())
        .merge(teams::router())
        .merge(admin::router(state.clone()));

    api_router.merge(docs::router()).with_state(state)
}

/// Parse the `{type}` path segment, answering 404 for unknown formats.
fn tournament_type(raw: &str) -> Result<TournamentType, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("Tournament not found: {raw}")))
}

/// Unwrap a `{id}` path segment, answering 400 when it is not a UUID.
fn team_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::BadRequest("Team ID must be a valid UUID".into()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::score_store::MemoryScoreStore,
        services::submission_service::MULLIGAN_PERMISSION_WARNING,
        state::AppState,
    };

    const TOKEN: &str = "letmein";

    async fn connected() -> (SharedState, MemoryScoreStore) {
        let config = AppConfig::default();
        let store = MemoryScoreStore::new();
        store.seed_tournaments(config.tournaments().iter().cloned());
        let state = AppState::new(config, Some(TOKEN.into()));
        state.set_score_store(Arc::new(store.clone())).await;
        (state, store)
    }

    async fn call(
        state: &SharedState,
        method: &str,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header("x-admin-token", token);
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    /// Register two players and a 2-man team through the admin routes.
    async fn register_team(state: &SharedState) -> (String, String, String) {
        let mut ids = Vec::new();
        for name in ["Ivy", "Jon"] {
            let (status, body) = call(
                state,
                "POST",
                "/api/admin/players",
                Some(json!({"name": name})),
                Some(TOKEN),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            ids.push(body["data"]["id"].as_str().unwrap().to_owned());
        }

        let (status, body) = call(
            state,
            "POST",
            "/api/admin/teams",
            Some(json!({
                "name": "Chip Shots",
                "handicap": 1,
                "tournament_type": "2-man",
                "player_ids": ids,
            })),
            Some(TOKEN),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let team_id = body["data"]["id"].as_str().unwrap().to_owned();
        (team_id, ids[0].clone(), ids[1].clone())
    }

    #[tokio::test]
    async fn degraded_mode_is_reported() {
        let state = AppState::new(AppConfig::default(), None);

        let (status, body) = call(&state, "GET", "/healthcheck", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "degraded"}));

        let (status, body) =
            call(&state, "GET", "/api/tournaments/2-man/leaderboard", None, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn admin_routes_need_the_configured_token() {
        let (state, _) = connected().await;
        let body = Some(json!({"name": "Kim"}));

        let (status, _) = call(&state, "POST", "/api/admin/players", body.clone(), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) =
            call(&state, "POST", "/api/admin/players", body.clone(), Some("nope")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let disabled = AppState::new(AppConfig::default(), None);
        disabled
            .set_score_store(Arc::new(MemoryScoreStore::new()))
            .await;
        let (status, body) =
            call(&disabled, "POST", "/api/admin/players", body, Some(TOKEN)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn admin_bodies_are_validated() {
        let (state, _) = connected().await;
        let (status, body) = call(
            &state,
            "POST",
            "/api/admin/players",
            Some(json!({"name": ""})),
            Some(TOKEN),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("validation failed"));
    }

    #[tokio::test]
    async fn submitted_scores_reach_the_leaderboard() {
        let (state, _) = connected().await;
        let (team_id, ivy, jon) = register_team(&state).await;

        let (status, body) = call(
            &state,
            "POST",
            "/api/scores/submit",
            Some(json!({
                "team_id": team_id,
                "tournament_type": "2-man",
                "scores": [
                    {"hole_number": 1, "strokes": 3, "drive_player_id": ivy},
                    {"hole_number": 2, "strokes": 4, "drive_player_id": jon,
                     "mulligan_player_id": ""}
                ]
            })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert!(body.get("warning").is_none());

        let (status, body) =
            call(&state, "GET", "/api/tournaments/2-man/leaderboard", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let entry = &body["data"]["leaderboard"][0];
        assert_eq!(entry["total_strokes"], 7);
        assert_eq!(entry["relative_to_par"], -1);
        assert_eq!(entry["net_relative_to_par"], -2);
        assert_eq!(entry["relative_display"], "-1");
        assert_eq!(entry["thru"], "2");
        assert_eq!(body["data"]["tournament"]["type"], "2-man");

        let (status, body) =
            call(&state, "GET", &format!("/api/teams/{team_id}/scores"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][1]["hole_number"], 2);
    }

    #[tokio::test]
    async fn refused_mulligan_is_reported_as_a_warning() {
        let (state, store) = connected().await;
        let (team_id, ivy, jon) = register_team(&state).await;
        store.deny_mulligan_writes(true);

        let (status, body) = call(
            &state,
            "POST",
            "/api/scores/submit",
            Some(json!({
                "team_id": team_id,
                "tournament_type": "2-man",
                "hole_number": 4,
                "strokes": 5,
                "drive_player_id": ivy,
                "mulligan_player_id": jon
            })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["warning"], MULLIGAN_PERMISSION_WARNING);
        assert!(body["data"].get("mulligan_player_id").is_none());
    }

    #[tokio::test]
    async fn bad_requests_answer_with_the_error_envelope() {
        let (state, _) = connected().await;

        let (status, body) = call(
            &state,
            "POST",
            "/api/scores/submit",
            Some(json!({"tournament_type": "2-man", "hole_number": 1})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"success": false, "error": "Team ID is required"}));

        let (status, _) = call(&state, "GET", "/api/tournaments/3-man", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&state, "GET", "/api/teams/not-a-uuid", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let missing = uuid::Uuid::new_v4();
        let (status, _) = call(&state, "GET", &format!("/api/teams/{missing}"), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
