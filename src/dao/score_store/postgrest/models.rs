use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::{
    CoursePars, PlayerEntity, RosterEntry, ScoreEntity, ScoreUpsert, TeamEntity, TournamentEntity,
    TournamentType,
};

pub const TOURNAMENTS_TABLE: &str = "tournaments";
pub const TEAMS_TABLE: &str = "teams";
pub const PLAYERS_TABLE: &str = "players";
pub const TEAM_PLAYERS_TABLE: &str = "team_players";
pub const SCORES_TABLE: &str = "scores";

/// Columns forming the unique constraint targeted by score upserts.
pub const SCORE_CONFLICT_COLUMNS: &str = "team_id,hole_number,tournament_type";

/// Error body returned by PostgREST.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TournamentRow {
    #[serde(rename = "type")]
    pub tournament_type: TournamentType,
    pub name: String,
    #[serde(default)]
    pub default_mulligans: u32,
    #[serde(default)]
    pub course_pars: CoursePars,
}

impl From<TournamentRow> for TournamentEntity {
    fn from(row: TournamentRow) -> Self {
        Self {
            tournament_type: row.tournament_type,
            name: row.name,
            default_mulligans: row.default_mulligans,
            course_pars: row.course_pars,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TeamRow {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub handicap: i32,
    pub tournament_type: TournamentType,
}

impl From<TeamRow> for TeamEntity {
    fn from(row: TeamRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            handicap: row.handicap,
            tournament_type: row.tournament_type,
        }
    }
}

impl From<TeamEntity> for TeamRow {
    fn from(team: TeamEntity) -> Self {
        Self {
            id: team.id,
            name: team.name,
            handicap: team.handicap,
            tournament_type: team.tournament_type,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlayerRow {
    pub id: Uuid,
    pub name: String,
}

impl From<PlayerRow> for PlayerEntity {
    fn from(row: PlayerRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

impl From<PlayerEntity> for PlayerRow {
    fn from(player: PlayerEntity) -> Self {
        Self {
            id: player.id,
            name: player.name,
        }
    }
}

/// `team_players` row with the player embedded through its foreign key.
#[derive(Debug, Deserialize)]
pub struct RosterRow {
    pub team_id: Uuid,
    #[serde(default)]
    pub players: Option<PlayerRow>,
}

impl RosterRow {
    /// Drop rows whose player is not visible to the caller.
    pub fn into_entry(self) -> Option<RosterEntry> {
        let team_id = self.team_id;
        self.players.map(|player| RosterEntry {
            team_id,
            player: player.into(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct TeamPlayerInsertRow {
    pub team_id: Uuid,
    pub player_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ScoreRow {
    pub id: Uuid,
    pub team_id: Uuid,
    pub hole_number: u8,
    pub strokes: u32,
    pub drive_player_id: Uuid,
    #[serde(default)]
    pub mulligan_player_id: Option<Uuid>,
    pub tournament_type: TournamentType,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<ScoreRow> for ScoreEntity {
    fn from(row: ScoreRow) -> Self {
        Self {
            id: row.id,
            team_id: row.team_id,
            hole_number: row.hole_number,
            strokes: row.strokes,
            drive_player_id: row.drive_player_id,
            mulligan_player_id: row.mulligan_player_id,
            tournament_type: row.tournament_type,
            created_at: row.created_at.into(),
        }
    }
}

/// Body of a score upsert. `mulligan_player_id` is always sent so a cleared mulligan
/// overwrites the stored one.
#[derive(Debug, Serialize)]
pub struct ScoreUpsertRow {
    pub team_id: Uuid,
    pub hole_number: u8,
    pub strokes: u32,
    pub drive_player_id: Uuid,
    pub mulligan_player_id: Option<Uuid>,
    pub tournament_type: TournamentType,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<ScoreUpsert> for ScoreUpsertRow {
    fn from(score: ScoreUpsert) -> Self {
        Self {
            team_id: score.team_id,
            hole_number: score.hole_number,
            strokes: score.strokes,
            drive_player_id: score.drive_player_id,
            mulligan_player_id: score.mulligan_player_id,
            tournament_type: score.tournament_type,
            created_at: score.created_at.into(),
        }
    }
}

/// PostgREST filter value matching a single column value.
pub fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

/// PostgREST filter value matching any of `values`.
pub fn in_list(values: &[Uuid]) -> String {
    let joined = values
        .iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({joined})")
}
