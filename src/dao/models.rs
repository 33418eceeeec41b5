use std::{collections::BTreeMap, fmt, str::FromStr, time::SystemTime};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lowest hole number on the course.
pub const FIRST_HOLE: u8 = 1;
/// Highest hole number on the course.
pub const LAST_HOLE: u8 = 18;
/// Highest stroke count accepted for a single hole.
pub const MAX_STROKES: u32 = 99;

/// Hole number to par mapping for a course.
pub type CoursePars = BTreeMap<u8, i32>;

/// Scramble formats supported by the tournament.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
pub enum TournamentType {
    /// Two players per team.
    #[serde(rename = "2-man")]
    TwoMan,
    /// Four players per team.
    #[serde(rename = "4-man")]
    FourMan,
}

impl TournamentType {
    /// Every tournament type, in display order.
    pub const ALL: [TournamentType; 2] = [TournamentType::TwoMan, TournamentType::FourMan];

    /// Wire representation (`2-man` / `4-man`).
    pub fn as_str(self) -> &'static str {
        match self {
            TournamentType::TwoMan => "2-man",
            TournamentType::FourMan => "4-man",
        }
    }

    /// Number of players a team of this format owns.
    pub fn team_size(self) -> usize {
        match self {
            TournamentType::TwoMan => 2,
            TournamentType::FourMan => 4,
        }
    }
}

impl fmt::Display for TournamentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a string does not name a known tournament type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tournament type `{0}`")]
pub struct UnknownTournamentType(pub String);

impl FromStr for TournamentType {
    type Err = UnknownTournamentType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "2-man" => Ok(TournamentType::TwoMan),
            "4-man" => Ok(TournamentType::FourMan),
            other => Err(UnknownTournamentType(other.to_owned())),
        }
    }
}

/// Tournament definition, one per format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TournamentEntity {
    /// Format, also the primary key.
    pub tournament_type: TournamentType,
    /// Display name.
    pub name: String,
    /// Mulligans granted to every player at the start of the round.
    pub default_mulligans: u32,
    /// Par of every hole on the course.
    pub course_pars: CoursePars,
}

impl TournamentEntity {
    /// Par for `hole`, ignoring holes missing from the map or recorded as zero.
    pub fn par_for(&self, hole: u8) -> Option<i32> {
        self.course_pars.get(&hole).copied().filter(|par| *par != 0)
    }

    /// Sum of every par on the course.
    pub fn total_par(&self) -> i32 {
        self.course_pars.values().sum()
    }
}

/// Team registered in a tournament.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamEntity {
    /// Stable identifier for the team.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Strokes subtracted from the gross score to compute the net score.
    pub handicap: i32,
    /// Tournament the team plays in.
    pub tournament_type: TournamentType,
}

/// Player that can be rostered on teams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Stable identifier for the player.
    pub id: Uuid,
    /// Display name.
    pub name: String,
}

/// One row of the `team_players` join table with the player resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// Team owning the player.
    pub team_id: Uuid,
    /// Rostered player.
    pub player: PlayerEntity,
}

/// Uniqueness key of a score row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScoreKey {
    /// Team that played the hole.
    pub team_id: Uuid,
    /// Hole number, 1 to 18.
    pub hole_number: u8,
    /// Tournament the row belongs to.
    pub tournament_type: TournamentType,
}

/// Stored score for one hole played by one team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreEntity {
    /// Row identifier, kept across upserts of the same key.
    pub id: Uuid,
    /// Team that played the hole.
    pub team_id: Uuid,
    /// Hole number, 1 to 18.
    pub hole_number: u8,
    /// Strokes taken on the hole.
    pub strokes: u32,
    /// Player whose drive the team played.
    pub drive_player_id: Uuid,
    /// Player who used a mulligan on this hole, if any.
    pub mulligan_player_id: Option<Uuid>,
    /// Tournament the row belongs to.
    pub tournament_type: TournamentType,
    /// Time of the latest write.
    pub created_at: SystemTime,
}

impl ScoreEntity {
    /// Uniqueness key of this row.
    pub fn key(&self) -> ScoreKey {
        ScoreKey {
            team_id: self.team_id,
            hole_number: self.hole_number,
            tournament_type: self.tournament_type,
        }
    }
}

/// Values written by a score upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreUpsert {
    /// Team that played the hole.
    pub team_id: Uuid,
    /// Hole number, 1 to 18.
    pub hole_number: u8,
    /// Strokes taken on the hole.
    pub strokes: u32,
    /// Player whose drive the team played.
    pub drive_player_id: Uuid,
    /// Player who used a mulligan, if any.
    pub mulligan_player_id: Option<Uuid>,
    /// Tournament the row belongs to.
    pub tournament_type: TournamentType,
    /// Write timestamp.
    pub created_at: SystemTime,
}

impl ScoreUpsert {
    /// Uniqueness key targeted by this upsert.
    pub fn key(&self) -> ScoreKey {
        ScoreKey {
            team_id: self.team_id,
            hole_number: self.hole_number,
            tournament_type: self.tournament_type,
        }
    }

    /// Same write with the mulligan column cleared.
    pub fn without_mulligan(self) -> Self {
        Self {
            mulligan_player_id: None,
            ..self
        }
    }

    /// Materialise the stored row, reusing `id` when the key already existed.
    pub fn into_entity(self, id: Uuid) -> ScoreEntity {
        ScoreEntity {
            id,
            team_id: self.team_id,
            hole_number: self.hole_number,
            strokes: self.strokes,
            drive_player_id: self.drive_player_id,
            mulligan_player_id: self.mulligan_player_id,
            tournament_type: self.tournament_type,
            created_at: self.created_at,
        }
    }
}
