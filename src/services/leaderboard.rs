//! Leaderboard aggregation: pure reductions over fetched rows plus the async entry point that
//! gathers them.

use std::collections::{BTreeSet, HashMap};

use futures::try_join;
use indexmap::IndexMap;
use uuid::Uuid;

use crate::{
    dao::models::{
        PlayerEntity, RosterEntry, ScoreEntity, TeamEntity, TournamentEntity, TournamentType,
    },
    dto::leaderboard::{LeaderboardEntry, LeaderboardResponse},
    error::ServiceError,
    services::formatting::meets_minimum_drives,
    state::SharedState,
};

/// Number of holes a player drove for their team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveCount {
    /// Rostered player.
    pub player: PlayerEntity,
    /// Holes on which the team played this player's drive.
    pub count: u32,
}

/// Mulligans a player used and has left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulliganCount {
    /// Rostered player.
    pub player: PlayerEntity,
    /// Holes on which the player used a mulligan.
    pub used: u32,
    /// Allowance left, never below zero.
    pub remaining: u32,
}

/// Aggregated standing of one team.
#[derive(Debug, Clone)]
pub struct TeamStanding {
    /// The team being ranked.
    pub team: TeamEntity,
    /// Players in roster order.
    pub roster: Vec<PlayerEntity>,
    /// Strokes over every recorded hole.
    pub total_strokes: u64,
    /// Gross score against par over the recorded holes.
    pub relative_to_par: i64,
    /// `relative_to_par` minus the team handicap.
    pub net_relative_to_par: i64,
    /// Distinct holes recorded.
    pub holes_completed: usize,
    /// Drives per rostered player.
    pub drive_counts: Vec<DriveCount>,
    /// Mulligans per rostered player.
    pub mulligan_counts: Vec<MulliganCount>,
    /// Sum of the remaining mulligans.
    pub total_remaining_mulligans: u32,
    /// Every rostered player reached the minimum drive count.
    pub meets_minimum_drives: bool,
    /// Score rows ordered by hole number.
    pub scores: Vec<ScoreEntity>,
}

/// Count drives per roster player, in roster order. Drives by players off the roster are ignored.
pub fn tally_drives(roster: &[PlayerEntity], scores: &[ScoreEntity]) -> Vec<DriveCount> {
    let mut tally: IndexMap<Uuid, DriveCount> = roster
        .iter()
        .map(|player| {
            (
                player.id,
                DriveCount {
                    player: player.clone(),
                    count: 0,
                },
            )
        })
        .collect();

    for score in scores {
        if let Some(entry) = tally.get_mut(&score.drive_player_id) {
            entry.count += 1;
        }
    }

    tally.into_values().collect()
}

/// Count mulligans per roster player against `allowance`, in roster order.
pub fn tally_mulligans(
    roster: &[PlayerEntity],
    scores: &[ScoreEntity],
    allowance: u32,
) -> Vec<MulliganCount> {
    let mut tally: IndexMap<Uuid, MulliganCount> = roster
        .iter()
        .map(|player| {
            (
                player.id,
                MulliganCount {
                    player: player.clone(),
                    used: 0,
                    remaining: allowance,
                },
            )
        })
        .collect();

    for player_id in scores.iter().filter_map(|score| score.mulligan_player_id) {
        if let Some(entry) = tally.get_mut(&player_id) {
            entry.used += 1;
            entry.remaining = allowance.saturating_sub(entry.used);
        }
    }

    tally.into_values().collect()
}

/// Sum of strokes over par for the recorded holes; holes without a par count for nothing.
pub fn relative_to_par(tournament: &TournamentEntity, scores: &[ScoreEntity]) -> i64 {
    scores
        .iter()
        .filter_map(|score| {
            tournament
                .par_for(score.hole_number)
                .map(|par| i64::from(score.strokes) - i64::from(par))
        })
        .sum()
}

/// Aggregate one team. `scores` must belong to the team.
pub fn team_standing(
    tournament: &TournamentEntity,
    team: TeamEntity,
    roster: Vec<PlayerEntity>,
    mut scores: Vec<ScoreEntity>,
    minimum_drives: u32,
) -> TeamStanding {
    scores.sort_by_key(|score| score.hole_number);

    let total_strokes = scores.iter().map(|score| u64::from(score.strokes)).sum();
    let relative_to_par = relative_to_par(tournament, &scores);
    let holes_completed = scores
        .iter()
        .map(|score| score.hole_number)
        .collect::<BTreeSet<_>>()
        .len();
    let drive_counts = tally_drives(&roster, &scores);
    let mulligan_counts = tally_mulligans(&roster, &scores, tournament.default_mulligans);
    let total_remaining_mulligans = mulligan_counts.iter().map(|count| count.remaining).sum();
    let meets_minimum_drives = meets_minimum_drives(&drive_counts, minimum_drives);

    TeamStanding {
        net_relative_to_par: relative_to_par - i64::from(team.handicap),
        team,
        roster,
        total_strokes,
        relative_to_par,
        holes_completed,
        drive_counts,
        mulligan_counts,
        total_remaining_mulligans,
        meets_minimum_drives,
        scores,
    }
}

/// Rank every team of `tournament` by net score, then gross score, then name.
pub fn build_leaderboard(
    tournament: &TournamentEntity,
    teams: Vec<TeamEntity>,
    rosters: Vec<RosterEntry>,
    scores: Vec<ScoreEntity>,
    minimum_drives: u32,
) -> Vec<TeamStanding> {
    let mut rosters_by_team: HashMap<Uuid, Vec<PlayerEntity>> = HashMap::new();
    for entry in rosters {
        rosters_by_team
            .entry(entry.team_id)
            .or_default()
            .push(entry.player);
    }

    let mut scores_by_team: HashMap<Uuid, Vec<ScoreEntity>> = HashMap::new();
    for score in scores
        .into_iter()
        .filter(|score| score.tournament_type == tournament.tournament_type)
    {
        scores_by_team.entry(score.team_id).or_default().push(score);
    }

    let mut standings: Vec<TeamStanding> = teams
        .into_iter()
        .filter(|team| team.tournament_type == tournament.tournament_type)
        .map(|team| {
            let roster = rosters_by_team.remove(&team.id).unwrap_or_default();
            let scores = scores_by_team.remove(&team.id).unwrap_or_default();
            team_standing(tournament, team, roster, scores, minimum_drives)
        })
        .collect();

    standings.sort_by(|a, b| {
        a.net_relative_to_par
            .cmp(&b.net_relative_to_par)
            .then(a.relative_to_par.cmp(&b.relative_to_par))
            .then_with(|| a.team.name.cmp(&b.team.name))
    });
    standings
}

/// Fetch everything a tournament leaderboard needs and aggregate it.
pub async fn get_leaderboard(
    state: &SharedState,
    tournament_type: TournamentType,
) -> Result<LeaderboardResponse, ServiceError> {
    let store = state.require_score_store().await?;

    let (tournament, teams, rosters, scores) = try_join!(
        store.find_tournament(tournament_type),
        store.list_teams(tournament_type),
        store.list_rosters(tournament_type),
        store.list_scores(tournament_type),
    )?;

    let tournament = tournament.ok_or_else(|| {
        ServiceError::NotFound(format!("Tournament not found: {tournament_type}"))
    })?;

    let minimum_drives = state.config().minimum_drives(tournament_type);
    let leaderboard = build_leaderboard(&tournament, teams, rosters, scores, minimum_drives)
        .into_iter()
        .map(LeaderboardEntry::from)
        .collect();

    Ok(LeaderboardResponse {
        tournament: tournament.into(),
        leaderboard,
    })
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn tournament() -> TournamentEntity {
        TournamentEntity {
            tournament_type: TournamentType::TwoMan,
            name: "2-Man Scramble".into(),
            default_mulligans: 2,
            course_pars: (1..=18).map(|hole| (hole, 4)).collect(),
        }
    }

    fn player(name: &str) -> PlayerEntity {
        PlayerEntity {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }

    fn team(name: &str, handicap: i32) -> TeamEntity {
        TeamEntity {
            id: Uuid::new_v4(),
            name: name.into(),
            handicap,
            tournament_type: TournamentType::TwoMan,
        }
    }

    fn score(
        team: &TeamEntity,
        hole: u8,
        strokes: u32,
        driver: &PlayerEntity,
        mulligan: Option<&PlayerEntity>,
    ) -> ScoreEntity {
        ScoreEntity {
            id: Uuid::new_v4(),
            team_id: team.id,
            hole_number: hole,
            strokes,
            drive_player_id: driver.id,
            mulligan_player_id: mulligan.map(|p| p.id),
            tournament_type: team.tournament_type,
            created_at: SystemTime::now(),
        }
    }

    fn roster(team: &TeamEntity, players: &[&PlayerEntity]) -> Vec<RosterEntry> {
        players
            .iter()
            .map(|player| RosterEntry {
                team_id: team.id,
                player: (*player).clone(),
            })
            .collect()
    }

    #[test]
    fn relative_to_par_sums_strokes_minus_par() {
        let mut tournament = tournament();
        tournament.course_pars.insert(3, 5);
        tournament.course_pars.insert(9, 0);
        let team = team("Birdies", 0);
        let a = player("Ann");
        let scores = vec![
            score(&team, 1, 3, &a, None),
            score(&team, 3, 7, &a, None),
            score(&team, 9, 6, &a, None),
        ];

        // -1 on the first, +2 on the third, the par-less ninth is ignored.
        assert_eq!(relative_to_par(&tournament, &scores), 1);
    }

    #[test]
    fn net_subtracts_the_handicap() {
        let tournament = tournament();
        let team = team("Eagles", 3);
        let a = player("Ann");
        let scores = vec![score(&team, 1, 6, &a, None), score(&team, 2, 5, &a, None)];

        let standing = team_standing(&tournament, team, vec![a], scores, 0);
        assert_eq!(standing.total_strokes, 11);
        assert_eq!(standing.relative_to_par, 3);
        assert_eq!(standing.net_relative_to_par, 0);
        assert_eq!(standing.holes_completed, 2);
    }

    #[test]
    fn leaderboard_orders_by_net_then_gross_then_name() {
        let tournament = tournament();
        let a = player("Ann");
        let hooks = team("Hooks", 2);
        let slices = team("Slices", 0);
        let aces = team("Aces", 0);
        let zeros = team("Zeros", 0);

        let scores = vec![
            // gross +2, net 0
            score(&hooks, 1, 6, &a, None),
            // gross 0, net 0
            score(&slices, 1, 4, &a, None),
            score(&aces, 1, 4, &a, None),
            // gross -1, net -1
            score(&zeros, 1, 3, &a, None),
        ];

        let standings = build_leaderboard(
            &tournament,
            vec![hooks, slices, aces, zeros],
            Vec::new(),
            scores,
            0,
        );
        let names: Vec<&str> = standings.iter().map(|s| s.team.name.as_str()).collect();
        assert_eq!(names, ["Zeros", "Aces", "Slices", "Hooks"]);
        assert!(
            standings
                .windows(2)
                .all(|pair| pair[0].net_relative_to_par <= pair[1].net_relative_to_par)
        );
    }

    #[test]
    fn teams_without_scores_are_listed_even() {
        let tournament = tournament();
        let team = team("Late Starters", 0);
        let a = player("Ann");
        let b = player("Bob");
        let rosters = roster(&team, &[&a, &b]);

        let standings = build_leaderboard(&tournament, vec![team], rosters, Vec::new(), 5);
        let standing = &standings[0];
        assert_eq!(standing.holes_completed, 0);
        assert_eq!(standing.relative_to_par, 0);
        assert_eq!(standing.total_remaining_mulligans, 4);
        assert_eq!(standing.drive_counts.len(), 2);
        assert!(!standing.meets_minimum_drives);
    }

    #[test]
    fn drive_tally_follows_roster_order_and_skips_strangers() {
        let team = team("Grip It", 0);
        let a = player("Ann");
        let b = player("Bob");
        let stranger = player("Sub");
        let scores = vec![
            score(&team, 1, 4, &b, None),
            score(&team, 2, 4, &b, None),
            score(&team, 3, 4, &stranger, None),
            score(&team, 4, 4, &a, None),
        ];

        let drives = tally_drives(&[a.clone(), b.clone()], &scores);
        assert_eq!(drives.len(), 2);
        assert_eq!(drives[0].player, a);
        assert_eq!(drives[0].count, 1);
        assert_eq!(drives[1].player, b);
        assert_eq!(drives[1].count, 2);
    }

    #[test]
    fn mulligan_remaining_never_drops_below_zero() {
        let team = team("Mulligan Men", 0);
        let a = player("Ann");
        let b = player("Bob");
        let scores = vec![
            score(&team, 1, 4, &a, Some(&a)),
            score(&team, 2, 4, &a, Some(&a)),
            score(&team, 3, 4, &a, Some(&a)),
            score(&team, 4, 4, &a, Some(&b)),
        ];

        let counts = tally_mulligans(&[a, b], &scores, 2);
        assert_eq!((counts[0].used, counts[0].remaining), (3, 0));
        assert_eq!((counts[1].used, counts[1].remaining), (1, 1));
    }

    #[test]
    fn scores_from_other_tournaments_are_ignored() {
        let tournament = tournament();
        let team = team("Crossover", 0);
        let a = player("Ann");
        let mut stray = score(&team, 1, 9, &a, None);
        stray.tournament_type = TournamentType::FourMan;

        let standings =
            build_leaderboard(&tournament, vec![team], Vec::new(), vec![stray], 0);
        assert_eq!(standings[0].holes_completed, 0);
        assert_eq!(standings[0].total_strokes, 0);
    }

    #[test]
    fn oversized_stored_strokes_do_not_overflow_the_totals() {
        let tournament = tournament();
        let team = team("Legacy Rows", 3);
        let a = player("Ann");
        let scores = vec![
            score(&team, 1, u32::MAX, &a, None),
            score(&team, 2, u32::MAX, &a, None),
        ];

        let standing = team_standing(&tournament, team, vec![a], scores, 0);
        assert_eq!(standing.total_strokes, 2 * u64::from(u32::MAX));
        let expected = 2 * i64::from(u32::MAX) - 8;
        assert_eq!(standing.relative_to_par, expected);
        assert_eq!(standing.net_relative_to_par, expected - 3);
    }
}
