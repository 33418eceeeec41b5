use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};

use crate::{
    dto::{
        common::ApiResponse,
        score::{SubmitScoreRequest, SubmittedScores},
    },
    error::AppError,
    services::submission_service,
    state::SharedState,
};

/// Score submission endpoint.
pub fn router() -> Router<SharedState> {
    Router::new().route("/api/scores/submit", post(submit_score))
}

/// Record the score of one hole, or of several holes for the same team.
#[utoipa::path(
    post,
    path = "/api/scores/submit",
    tag = "scores",
    request_body = SubmitScoreRequest,
    responses(
        (status = 200, description = "Score saved; `warning` is set when the mulligan was dropped", body = SubmittedScores),
        (status = 400, description = "Validation failure or store rejection"),
        (status = 503, description = "No store connected")
    )
)]
pub async fn submit_score(
    State(state): State<SharedState>,
    payload: Result<Json<SubmitScoreRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<SubmittedScores>>, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let submission = request.into_submission()?;
    let response = submission_service::submit(&state, submission).await?;
    Ok(Json(ApiResponse::with_warning(response.data, response.warning)))
}
