use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::tournament::{
        DriveCountSummary, MulliganCountSummary, ScoreSummary, TeamSummary, TournamentSummary,
    },
    services::{
        formatting::{format_relative_to_par, format_thru},
        leaderboard::TeamStanding,
    },
};

/// One row of the leaderboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    pub team: TeamSummary,
    pub total_strokes: u64,
    pub relative_to_par: i64,
    pub net_relative_to_par: i64,
    /// `relative_to_par` rendered as `E`, `+n` or `-n`.
    pub relative_display: String,
    pub net_display: String,
    pub holes_completed: usize,
    /// Holes completed, or `F` when the round is over.
    pub thru: String,
    pub total_remaining_mulligans: u32,
    pub mulligan_counts: Vec<MulliganCountSummary>,
    pub drive_counts: Vec<DriveCountSummary>,
    pub meets_minimum_drives: bool,
    pub scores: Vec<ScoreSummary>,
}

impl From<TeamStanding> for LeaderboardEntry {
    fn from(standing: TeamStanding) -> Self {
        Self {
            relative_display: format_relative_to_par(standing.relative_to_par),
            net_display: format_relative_to_par(standing.net_relative_to_par),
            thru: format_thru(standing.holes_completed),
            team: TeamSummary::from_parts(standing.team, standing.roster),
            total_strokes: standing.total_strokes,
            relative_to_par: standing.relative_to_par,
            net_relative_to_par: standing.net_relative_to_par,
            holes_completed: standing.holes_completed,
            total_remaining_mulligans: standing.total_remaining_mulligans,
            mulligan_counts: standing
                .mulligan_counts
                .into_iter()
                .map(Into::into)
                .collect(),
            drive_counts: standing.drive_counts.into_iter().map(Into::into).collect(),
            meets_minimum_drives: standing.meets_minimum_drives,
            scores: standing.scores.into_iter().map(Into::into).collect(),
        }
    }
}

/// Tournament header and its ranked teams.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub tournament: TournamentSummary,
    pub leaderboard: Vec<LeaderboardEntry>,
}
