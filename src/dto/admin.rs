//! DTO definitions used by the admin REST API.

use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{dao::models::TournamentType, dto::validation::validate_display_name};

/// Request to register a player.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreatePlayerRequest {
    #[validate(
        length(min = 1, max = 80, message = "Player name must be 1 to 80 characters"),
        custom(function = "validate_display_name")
    )]
    pub name: String,
}

/// Request to register a team and its roster.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateTeamRequest {
    #[validate(
        length(min = 1, max = 80, message = "Team name must be 1 to 80 characters"),
        custom(function = "validate_display_name")
    )]
    pub name: String,
    /// Strokes subtracted from the gross score.
    #[serde(default)]
    pub handicap: i32,
    pub tournament_type: TournamentType,
    /// Roster in display order; its length must match the team size of the tournament.
    #[validate(length(min = 1, message = "At least one player is required"))]
    pub player_ids: Vec<Uuid>,
}
