//! Request and response bodies of `POST /api/scores/submit`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{MAX_STROKES, TournamentType},
    dto::tournament::ScoreSummary,
    error::ServiceError,
    services::submission_service::{ScoreSubmission, Submission},
};

/// Body of a score submission.
///
/// A numeric `hole_number` makes it a single-hole submission; otherwise `scores` carries a batch
/// for the same team.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SubmitScoreRequest {
    #[serde(default)]
    pub team_id: Option<String>,
    /// `2-man` or `4-man`.
    #[serde(default)]
    pub tournament_type: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<i64>)]
    pub hole_number: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<i64>)]
    pub strokes: Option<Value>,
    #[serde(default)]
    pub drive_player_id: Option<String>,
    /// An empty string means no mulligan.
    #[serde(default)]
    pub mulligan_player_id: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Vec<HoleScoreInput>>)]
    pub scores: Option<Value>,
}

/// One hole of a batch submission.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct HoleScoreInput {
    #[serde(default)]
    #[schema(value_type = i64)]
    pub hole_number: Option<Value>,
    #[serde(default)]
    #[schema(value_type = i64)]
    pub strokes: Option<Value>,
    #[serde(default)]
    pub drive_player_id: Option<String>,
    #[serde(default)]
    pub mulligan_player_id: Option<String>,
}

impl SubmitScoreRequest {
    /// Check the envelope fields and turn the body into a typed submission.
    pub fn into_submission(self) -> Result<Submission, ServiceError> {
        let team_id = self
            .team_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| invalid("Team ID is required"))?;

        let tournament_type = self
            .tournament_type
            .as_deref()
            .and_then(|value| value.parse::<TournamentType>().ok())
            .ok_or_else(|| invalid("Valid tournament type is required (2-man or 4-man)"))?;

        let team_id = Uuid::parse_str(team_id.trim())
            .map_err(|_| invalid("Team ID must be a valid UUID"))?;

        if let Some(Value::Number(hole_number)) = &self.hole_number {
            let hole_number = hole_number.as_i64().unwrap_or(i64::MIN);
            let strokes = positive_strokes(self.strokes.as_ref())?;
            let drive_player_id = drive_player(self.drive_player_id)?;

            return Ok(Submission::Single(ScoreSubmission {
                team_id,
                tournament_type,
                hole_number,
                strokes,
                drive_player_id,
                mulligan_player_id: mulligan_player(self.mulligan_player_id)?,
            }));
        }

        let rows = match self.scores {
            Some(value @ Value::Array(_)) => serde_json::from_value::<Vec<HoleScoreInput>>(value)
                .map_err(|err| invalid(&format!("Invalid scores array: {err}")))?,
            _ => Vec::new(),
        };
        if rows.is_empty() {
            return Err(invalid("Scores array is required for bulk submission"));
        }

        rows.into_iter()
            .map(|row| {
                Ok(ScoreSubmission {
                    team_id,
                    tournament_type,
                    hole_number: integer(row.hole_number.as_ref()).unwrap_or(i64::MIN),
                    strokes: integer(row.strokes.as_ref()).unwrap_or(0),
                    drive_player_id: drive_player(row.drive_player_id)?,
                    mulligan_player_id: mulligan_player(row.mulligan_player_id)?,
                })
            })
            .collect::<Result<Vec<_>, ServiceError>>()
            .map(Submission::Batch)
    }
}

fn invalid(message: &str) -> ServiceError {
    ServiceError::InvalidInput(message.to_owned())
}

fn integer(value: Option<&Value>) -> Option<i64> {
    value.and_then(Value::as_i64)
}

fn positive_strokes(value: Option<&Value>) -> Result<i64, ServiceError> {
    integer(value)
        .filter(|strokes| (1..=i64::from(MAX_STROKES)).contains(strokes))
        .ok_or_else(|| invalid("Valid strokes value is required"))
}

fn drive_player(value: Option<String>) -> Result<Uuid, ServiceError> {
    let raw = value
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| invalid("Drive player ID is required"))?;
    Uuid::parse_str(raw.trim()).map_err(|_| invalid("Drive player ID must be a valid UUID"))
}

fn mulligan_player(value: Option<String>) -> Result<Option<Uuid>, ServiceError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| invalid("Mulligan player ID must be a valid UUID")),
    }
}

/// Saved score row or rows, mirroring the shape of the request.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum SubmittedScores {
    One(ScoreSummary),
    Many(Vec<ScoreSummary>),
}

/// Result of a submission; `warning` is set when mulligans had to be dropped.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubmitScoreResponse {
    pub data: SubmittedScores,
    pub warning: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(body: Value) -> Result<Submission, ServiceError> {
        serde_json::from_value::<SubmitScoreRequest>(body)
            .unwrap()
            .into_submission()
    }

    fn error_of(body: Value) -> String {
        match parse(body) {
            Err(ServiceError::InvalidInput(message)) => message,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn numeric_hole_makes_a_single_submission() {
        let team = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let submission = parse(json!({
            "team_id": team.to_string(),
            "tournament_type": "2-man",
            "hole_number": 5,
            "strokes": 4,
            "drive_player_id": driver.to_string(),
            "mulligan_player_id": ""
        }))
        .unwrap();

        assert_eq!(
            submission,
            Submission::Single(ScoreSubmission {
                team_id: team,
                tournament_type: TournamentType::TwoMan,
                hole_number: 5,
                strokes: 4,
                drive_player_id: driver,
                mulligan_player_id: None,
            })
        );
    }

    #[test]
    fn envelope_fields_are_checked_in_order() {
        assert_eq!(error_of(json!({})), "Team ID is required");
        assert_eq!(
            error_of(json!({"team_id": Uuid::nil().to_string(), "tournament_type": "3-man"})),
            "Valid tournament type is required (2-man or 4-man)"
        );

        let single = json!({
            "team_id": Uuid::nil().to_string(),
            "tournament_type": "4-man",
            "hole_number": 1,
            "strokes": 0
        });
        assert_eq!(error_of(single), "Valid strokes value is required");

        let huge = json!({
            "team_id": Uuid::nil().to_string(),
            "tournament_type": "4-man",
            "hole_number": 1,
            "strokes": 3_000_000_000_i64
        });
        assert_eq!(error_of(huge), "Valid strokes value is required");

        let no_driver = json!({
            "team_id": Uuid::nil().to_string(),
            "tournament_type": "4-man",
            "hole_number": 1,
            "strokes": 3
        });
        assert_eq!(error_of(no_driver), "Drive player ID is required");
    }

    #[test]
    fn batch_requires_a_non_empty_array() {
        let body = json!({
            "team_id": Uuid::nil().to_string(),
            "tournament_type": "2-man",
            "scores": []
        });
        assert_eq!(error_of(body), "Scores array is required for bulk submission");

        let body = json!({
            "team_id": Uuid::nil().to_string(),
            "tournament_type": "2-man",
            "hole_number": "7"
        });
        assert_eq!(error_of(body), "Scores array is required for bulk submission");
    }

    #[test]
    fn batch_rows_share_the_envelope_team() {
        let team = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let submission = parse(json!({
            "team_id": team.to_string(),
            "tournament_type": "4-man",
            "scores": [
                {"hole_number": 1, "strokes": 4, "drive_player_id": driver.to_string()},
                {"hole_number": 2, "strokes": 3, "drive_player_id": driver.to_string(),
                 "mulligan_player_id": driver.to_string()}
            ]
        }))
        .unwrap();

        let Submission::Batch(rows) = submission else {
            panic!("expected a batch");
        };
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.team_id == team));
        assert_eq!(rows[1].mulligan_player_id, Some(driver));
    }
}
