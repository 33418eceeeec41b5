//! Read-side projections of tournaments, teams, players and scores.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{PlayerEntity, ScoreEntity, TeamEntity, TournamentEntity, TournamentType},
    dto::format_system_time,
    services::leaderboard::{DriveCount, MulliganCount},
};

/// Tournament definition with its course.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TournamentSummary {
    #[serde(rename = "type")]
    pub tournament_type: TournamentType,
    pub name: String,
    pub default_mulligans: u32,
    /// Par keyed by hole number.
    pub course_pars: BTreeMap<u8, i32>,
    pub total_par: i32,
}

impl From<TournamentEntity> for TournamentSummary {
    fn from(tournament: TournamentEntity) -> Self {
        Self {
            total_par: tournament.total_par(),
            tournament_type: tournament.tournament_type,
            name: tournament.name,
            default_mulligans: tournament.default_mulligans,
            course_pars: tournament.course_pars,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    pub id: Uuid,
    pub name: String,
}

impl From<PlayerEntity> for PlayerSummary {
    fn from(player: PlayerEntity) -> Self {
        Self {
            id: player.id,
            name: player.name,
        }
    }
}

/// Team with its roster in join-table order.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamSummary {
    pub id: Uuid,
    pub name: String,
    pub handicap: i32,
    pub tournament_type: TournamentType,
    pub players: Vec<PlayerSummary>,
}

impl TeamSummary {
    pub fn from_parts(team: TeamEntity, roster: Vec<PlayerEntity>) -> Self {
        Self {
            id: team.id,
            name: team.name,
            handicap: team.handicap,
            tournament_type: team.tournament_type,
            players: roster.into_iter().map(Into::into).collect(),
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScoreSummary {
    pub id: Uuid,
    pub team_id: Uuid,
    pub hole_number: u8,
    pub strokes: u32,
    pub drive_player_id: Uuid,
    pub mulligan_player_id: Option<Uuid>,
    pub tournament_type: TournamentType,
    /// RFC 3339 timestamp of the latest write.
    pub created_at: String,
}

impl From<ScoreEntity> for ScoreSummary {
    fn from(score: ScoreEntity) -> Self {
        Self {
            id: score.id,
            team_id: score.team_id,
            hole_number: score.hole_number,
            strokes: score.strokes,
            drive_player_id: score.drive_player_id,
            mulligan_player_id: score.mulligan_player_id,
            tournament_type: score.tournament_type,
            created_at: format_system_time(score.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DriveCountSummary {
    /// Player identifier.
    pub id: Uuid,
    pub name: String,
    pub count: u32,
}

impl From<DriveCount> for DriveCountSummary {
    fn from(drive: DriveCount) -> Self {
        Self {
            id: drive.player.id,
            name: drive.player.name,
            count: drive.count,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MulliganCountSummary {
    /// Player identifier.
    pub id: Uuid,
    pub name: String,
    pub used: u32,
    pub remaining: u32,
}

impl From<MulliganCount> for MulliganCountSummary {
    fn from(mulligan: MulliganCount) -> Self {
        Self {
            id: mulligan.player.id,
            name: mulligan.player.name,
            used: mulligan.used,
            remaining: mulligan.remaining,
        }
    }
}

/// Drive tally of one team and whether the minimum is met.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamDrivesResponse {
    pub team_id: Uuid,
    pub minimum_drives: u32,
    pub meets_minimum_drives: bool,
    pub drive_counts: Vec<DriveCountSummary>,
}

/// Mulligan tally of one team.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamMulligansResponse {
    pub team_id: Uuid,
    pub total_remaining_mulligans: u32,
    pub mulligan_counts: Vec<MulliganCountSummary>,
}
