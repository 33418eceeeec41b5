//! Score submission: validation against the team roster and tournament rules, upsert keyed by
//! (team, hole, tournament), and a single retry without mulligans when the store refuses them.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::SystemTime,
};

use futures::try_join;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{
            FIRST_HOLE, LAST_HOLE, MAX_STROKES, PlayerEntity, ScoreEntity, ScoreUpsert,
            TeamEntity, TournamentEntity, TournamentType,
        },
        score_store::ScoreStore,
    },
    dto::score::{SubmitScoreResponse, SubmittedScores},
    error::ServiceError,
    state::SharedState,
};

/// Warning attached to a save that went through only after dropping the mulligan.
pub const MULLIGAN_PERMISSION_WARNING: &str =
    "Mulligan could not be saved due to permissions. Score saved without mulligan.";

/// One hole's score as received from a client. Numbers are kept raw until validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSubmission {
    /// Team that played the hole.
    pub team_id: Uuid,
    /// Tournament the team is expected to play in.
    pub tournament_type: TournamentType,
    /// Unchecked hole number.
    pub hole_number: i64,
    /// Unchecked stroke count.
    pub strokes: i64,
    /// Player whose drive was played.
    pub drive_player_id: Uuid,
    /// Player who used a mulligan, if any.
    pub mulligan_player_id: Option<Uuid>,
}

/// A single hole or a batch of holes for the same team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// One hole.
    Single(ScoreSubmission),
    /// Several holes saved together.
    Batch(Vec<ScoreSubmission>),
}

/// Saved rows, with a warning when the mulligans had to be dropped.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome<T> {
    /// Row or rows as stored.
    pub saved: T,
    /// Set when the save only went through without mulligans.
    pub warning: Option<String>,
}

impl<T> SubmissionOutcome<T> {
    fn saved(saved: T) -> Self {
        Self {
            saved,
            warning: None,
        }
    }

    fn without_mulligan(saved: T) -> Self {
        Self {
            saved,
            warning: Some(MULLIGAN_PERMISSION_WARNING.to_owned()),
        }
    }

    /// True when the rows were saved with their mulligans cleared.
    pub fn is_degraded(&self) -> bool {
        self.warning.is_some()
    }
}

/// Dispatch a parsed request body to the single or batch path.
pub async fn submit(
    state: &SharedState,
    submission: Submission,
) -> Result<SubmitScoreResponse, ServiceError> {
    match submission {
        Submission::Single(score) => {
            let outcome = submit_score(state, score).await?;
            Ok(SubmitScoreResponse {
                data: SubmittedScores::One(outcome.saved.into()),
                warning: outcome.warning,
            })
        }
        Submission::Batch(scores) => {
            let outcome = submit_scores(state, scores).await?;
            Ok(SubmitScoreResponse {
                data: SubmittedScores::Many(outcome.saved.into_iter().map(Into::into).collect()),
                warning: outcome.warning,
            })
        }
    }
}

/// Validate and upsert the score of one hole.
pub async fn submit_score(
    state: &SharedState,
    submission: ScoreSubmission,
) -> Result<SubmissionOutcome<ScoreEntity>, ServiceError> {
    let (hole_number, strokes) = validate_numbers(&submission)?;
    let store = state.require_score_store().await?;

    let context = load_team_context(
        &store,
        submission.team_id,
        submission.tournament_type,
    )
    .await?;
    context.check_players(&submission)?;

    if let Some(player_id) = submission.mulligan_player_id {
        let recorded = store.team_scores(submission.team_id).await?;
        let used = recorded
            .iter()
            .filter(|score| {
                score.tournament_type == submission.tournament_type
                    && score.hole_number != hole_number
                    && score.mulligan_player_id == Some(player_id)
            })
            .count();
        context.check_mulligan_allowance(player_id, used + 1)?;
    }

    let row = ScoreUpsert {
        team_id: submission.team_id,
        hole_number,
        strokes,
        drive_player_id: submission.drive_player_id,
        mulligan_player_id: submission.mulligan_player_id,
        tournament_type: submission.tournament_type,
        created_at: SystemTime::now(),
    };

    let outcome = upsert_score_with_fallback(&store, row).await?;
    info!(
        team_id = %submission.team_id,
        hole_number,
        strokes,
        degraded = outcome.is_degraded(),
        "score saved"
    );
    Ok(outcome)
}

/// Validate every row of a batch, then upsert them in one store call.
pub async fn submit_scores(
    state: &SharedState,
    submissions: Vec<ScoreSubmission>,
) -> Result<SubmissionOutcome<Vec<ScoreEntity>>, ServiceError> {
    let Some(first) = submissions.first() else {
        return Err(ServiceError::InvalidInput("No scores provided".into()));
    };
    let team_id = first.team_id;
    let tournament_type = first.tournament_type;

    if submissions
        .iter()
        .any(|score| score.team_id != team_id || score.tournament_type != tournament_type)
    {
        return Err(ServiceError::InvalidInput(
            "All scores must be for the same team and tournament".into(),
        ));
    }

    let mut holes = HashSet::with_capacity(submissions.len());
    let mut numbers = Vec::with_capacity(submissions.len());
    for submission in &submissions {
        let (hole_number, strokes) = validate_numbers(submission)?;
        if !holes.insert(hole_number) {
            return Err(ServiceError::InvalidInput(format!(
                "Hole {hole_number} appears more than once"
            )));
        }
        numbers.push((hole_number, strokes));
    }

    let store = state.require_score_store().await?;
    let context = load_team_context(&store, team_id, tournament_type).await?;
    for submission in &submissions {
        context.check_players(submission)?;
    }

    let mut batch_uses: HashMap<Uuid, usize> = HashMap::new();
    for player_id in submissions.iter().filter_map(|s| s.mulligan_player_id) {
        *batch_uses.entry(player_id).or_default() += 1;
    }
    if !batch_uses.is_empty() {
        let recorded = store.team_scores(team_id).await?;
        for (player_id, uses) in &batch_uses {
            let earlier = recorded
                .iter()
                .filter(|score| {
                    score.tournament_type == tournament_type
                        && !holes.contains(&score.hole_number)
                        && score.mulligan_player_id == Some(*player_id)
                })
                .count();
            context.check_mulligan_allowance(*player_id, earlier + uses)?;
        }
    }

    let created_at = SystemTime::now();
    let rows = submissions
        .iter()
        .zip(numbers)
        .map(|(submission, (hole_number, strokes))| ScoreUpsert {
            team_id,
            hole_number,
            strokes,
            drive_player_id: submission.drive_player_id,
            mulligan_player_id: submission.mulligan_player_id,
            tournament_type,
            created_at,
        })
        .collect();

    let outcome = upsert_scores_with_fallback(&store, rows).await?;
    info!(
        team_id = %team_id,
        count = outcome.saved.len(),
        degraded = outcome.is_degraded(),
        "score batch saved"
    );
    Ok(outcome)
}

/// Range checks that need no store access.
fn validate_numbers(submission: &ScoreSubmission) -> Result<(u8, u32), ServiceError> {
    let hole_number = u8::try_from(submission.hole_number)
        .ok()
        .filter(|hole| (FIRST_HOLE..=LAST_HOLE).contains(hole))
        .ok_or_else(|| {
            ServiceError::InvalidInput(format!(
                "Hole number must be between {FIRST_HOLE} and {LAST_HOLE}"
            ))
        })?;

    let strokes = u32::try_from(submission.strokes)
        .ok()
        .filter(|strokes| (1..=MAX_STROKES).contains(strokes))
        .ok_or_else(|| ServiceError::InvalidInput("Valid strokes value is required".into()))?;

    Ok((hole_number, strokes))
}

/// Team, roster and tournament a submission is checked against.
struct TeamContext {
    tournament: TournamentEntity,
    roster: Vec<PlayerEntity>,
}

impl TeamContext {
    fn is_rostered(&self, player_id: Uuid) -> bool {
        self.roster.iter().any(|player| player.id == player_id)
    }

    fn check_players(&self, submission: &ScoreSubmission) -> Result<(), ServiceError> {
        if !self.is_rostered(submission.drive_player_id) {
            return Err(ServiceError::InvalidInput(
                "Drive player not found on this team".into(),
            ));
        }
        if let Some(player_id) = submission.mulligan_player_id {
            if !self.is_rostered(player_id) {
                return Err(ServiceError::InvalidInput(
                    "Mulligan player not found on this team".into(),
                ));
            }
        }
        Ok(())
    }

    /// Reject when `total_uses`, this submission included, exceeds the allowance.
    fn check_mulligan_allowance(
        &self,
        player_id: Uuid,
        total_uses: usize,
    ) -> Result<(), ServiceError> {
        let allowance = self.tournament.default_mulligans as usize;
        if total_uses <= allowance {
            return Ok(());
        }

        let name = self
            .roster
            .iter()
            .find(|player| player.id == player_id)
            .map(|player| player.name.as_str())
            .unwrap_or("Player");
        Err(ServiceError::InvalidInput(format!(
            "{name} has no mulligans remaining (allowance {allowance})"
        )))
    }
}

async fn load_team_context(
    store: &Arc<dyn ScoreStore>,
    team_id: Uuid,
    tournament_type: TournamentType,
) -> Result<TeamContext, ServiceError> {
    let (team, roster, tournament) = try_join!(
        store.find_team(team_id),
        store.team_roster(team_id),
        store.find_tournament(tournament_type),
    )?;

    let team_found = team
        .as_ref()
        .is_some_and(|team: &TeamEntity| team.tournament_type == tournament_type);
    if !team_found {
        return Err(ServiceError::InvalidInput(format!(
            "Team not found in the {tournament_type} tournament"
        )));
    }

    let tournament = tournament.ok_or_else(|| {
        ServiceError::NotFound(format!("Tournament not found: {tournament_type}"))
    })?;

    Ok(TeamContext { tournament, roster })
}

async fn upsert_score_with_fallback(
    store: &Arc<dyn ScoreStore>,
    row: ScoreUpsert,
) -> Result<SubmissionOutcome<ScoreEntity>, ServiceError> {
    let has_mulligan = row.mulligan_player_id.is_some();
    match store.upsert_score(row.clone()).await {
        Ok(saved) => Ok(SubmissionOutcome::saved(saved)),
        Err(err) if err.is_permission_denied() && has_mulligan => {
            warn!(error = %err, "mulligan write refused; retrying without mulligan");
            match store.upsert_score(row.without_mulligan()).await {
                Ok(saved) => Ok(SubmissionOutcome::without_mulligan(saved)),
                Err(retry_err) => {
                    warn!(error = %retry_err, "retry without mulligan failed");
                    Err(err.into())
                }
            }
        }
        Err(err) => Err(err.into()),
    }
}

async fn upsert_scores_with_fallback(
    store: &Arc<dyn ScoreStore>,
    rows: Vec<ScoreUpsert>,
) -> Result<SubmissionOutcome<Vec<ScoreEntity>>, ServiceError> {
    let has_mulligan = rows.iter().any(|row| row.mulligan_player_id.is_some());
    match store.upsert_scores(rows.clone()).await {
        Ok(saved) => Ok(SubmissionOutcome::saved(saved)),
        Err(err) if err.is_permission_denied() && has_mulligan => {
            warn!(error = %err, "mulligan write refused; retrying batch without mulligans");
            let stripped = rows.into_iter().map(ScoreUpsert::without_mulligan).collect();
            match store.upsert_scores(stripped).await {
                Ok(saved) => Ok(SubmissionOutcome::without_mulligan(saved)),
                Err(retry_err) => {
                    warn!(error = %retry_err, "batch retry without mulligans failed");
                    Err(err.into())
                }
            }
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::score_store::MemoryScoreStore,
        state::{AppState, SharedState},
    };

    struct Fixture {
        state: SharedState,
        store: MemoryScoreStore,
        team: TeamEntity,
        ann: PlayerEntity,
        bob: PlayerEntity,
    }

    async fn fixture() -> Fixture {
        let config = AppConfig::default();
        let store = MemoryScoreStore::new();
        store.seed_tournaments(config.tournaments().iter().cloned());

        let ann = PlayerEntity {
            id: Uuid::new_v4(),
            name: "Ann".into(),
        };
        let bob = PlayerEntity {
            id: Uuid::new_v4(),
            name: "Bob".into(),
        };
        store.save_player(ann.clone()).await.unwrap();
        store.save_player(bob.clone()).await.unwrap();

        let team = TeamEntity {
            id: Uuid::new_v4(),
            name: "Fore Play".into(),
            handicap: 2,
            tournament_type: TournamentType::TwoMan,
        };
        store
            .save_team(team.clone(), vec![ann.id, bob.id])
            .await
            .unwrap();

        let state = AppState::new(config, None);
        state.set_score_store(Arc::new(store.clone())).await;

        Fixture {
            state,
            store,
            team,
            ann,
            bob,
        }
    }

    fn hole(fixture: &Fixture, hole_number: i64, strokes: i64) -> ScoreSubmission {
        ScoreSubmission {
            team_id: fixture.team.id,
            tournament_type: TournamentType::TwoMan,
            hole_number,
            strokes,
            drive_player_id: fixture.ann.id,
            mulligan_player_id: None,
        }
    }

    fn message(err: ServiceError) -> String {
        match err {
            ServiceError::InvalidInput(message) => message,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn resubmitting_a_hole_replaces_the_row() {
        let fx = fixture().await;

        let first = submit_score(&fx.state, hole(&fx, 3, 5)).await.unwrap();
        let second = submit_score(&fx.state, hole(&fx, 3, 4)).await.unwrap();

        assert_eq!(fx.store.score_count(), 1);
        assert_eq!(first.saved.id, second.saved.id);
        assert_eq!(second.saved.strokes, 4);
        assert!(!second.is_degraded());
    }

    #[tokio::test]
    async fn out_of_range_values_are_rejected_before_writing() {
        let fx = fixture().await;

        let cases = [
            (0, 4),
            (19, 4),
            (-1, 4),
            (5, 0),
            (5, -2),
            (5, 100),
            (5, 3_000_000_000),
        ];
        for (hole_number, strokes) in cases {
            assert!(submit_score(&fx.state, hole(&fx, hole_number, strokes)).await.is_err());
        }
        assert_eq!(fx.store.score_count(), 0);

        let board = crate::services::leaderboard::get_leaderboard(&fx.state, TournamentType::TwoMan)
            .await
            .unwrap();
        assert_eq!(board.leaderboard[0].total_strokes, 0);
    }

    #[tokio::test]
    async fn validation_runs_before_the_store_is_needed() {
        let state = AppState::new(AppConfig::default(), None);
        let submission = ScoreSubmission {
            team_id: Uuid::new_v4(),
            tournament_type: TournamentType::TwoMan,
            hole_number: 42,
            strokes: 4,
            drive_player_id: Uuid::new_v4(),
            mulligan_player_id: None,
        };

        let err = submit_score(&state, submission.clone()).await.unwrap_err();
        assert_eq!(message(err), "Hole number must be between 1 and 18");

        let valid = ScoreSubmission {
            hole_number: 4,
            ..submission
        };
        assert!(matches!(
            submit_score(&state, valid).await,
            Err(ServiceError::Degraded)
        ));
    }

    #[tokio::test]
    async fn team_and_players_must_match() {
        let fx = fixture().await;

        let wrong_tournament = ScoreSubmission {
            tournament_type: TournamentType::FourMan,
            ..hole(&fx, 1, 4)
        };
        let err = submit_score(&fx.state, wrong_tournament).await.unwrap_err();
        assert_eq!(message(err), "Team not found in the 4-man tournament");

        let stranger = ScoreSubmission {
            drive_player_id: Uuid::new_v4(),
            ..hole(&fx, 1, 4)
        };
        let err = submit_score(&fx.state, stranger).await.unwrap_err();
        assert_eq!(message(err), "Drive player not found on this team");

        let stranger_mulligan = ScoreSubmission {
            mulligan_player_id: Some(Uuid::new_v4()),
            ..hole(&fx, 1, 4)
        };
        let err = submit_score(&fx.state, stranger_mulligan).await.unwrap_err();
        assert_eq!(message(err), "Mulligan player not found on this team");

        assert_eq!(fx.store.score_count(), 0);
    }

    #[tokio::test]
    async fn refused_mulligan_is_dropped_with_a_warning() {
        let fx = fixture().await;
        fx.store.deny_mulligan_writes(true);

        let submission = ScoreSubmission {
            mulligan_player_id: Some(fx.bob.id),
            ..hole(&fx, 7, 3)
        };
        let outcome = submit_score(&fx.state, submission).await.unwrap();

        assert!(outcome.is_degraded());
        assert_eq!(outcome.warning.as_deref(), Some(MULLIGAN_PERMISSION_WARNING));
        assert_eq!(outcome.saved.mulligan_player_id, None);
        assert_eq!(outcome.saved.strokes, 3);
        assert_eq!(fx.store.score_count(), 1);
    }

    #[tokio::test]
    async fn mulligans_beyond_the_allowance_are_rejected() {
        let fx = fixture().await;
        // The default 2-man allowance is three mulligans per player.
        for hole_number in 1..=3 {
            let submission = ScoreSubmission {
                mulligan_player_id: Some(fx.bob.id),
                ..hole(&fx, hole_number, 4)
            };
            submit_score(&fx.state, submission).await.unwrap();
        }

        // Re-recording a hole that already used the mulligan stays within the cap.
        let resubmit = ScoreSubmission {
            mulligan_player_id: Some(fx.bob.id),
            ..hole(&fx, 2, 5)
        };
        submit_score(&fx.state, resubmit).await.unwrap();

        let fourth = ScoreSubmission {
            mulligan_player_id: Some(fx.bob.id),
            ..hole(&fx, 4, 4)
        };
        let err = submit_score(&fx.state, fourth).await.unwrap_err();
        assert!(message(err).starts_with("Bob has no mulligans remaining"));
        assert_eq!(fx.store.score_count(), 3);
    }

    #[tokio::test]
    async fn batches_are_checked_as_a_whole() {
        let fx = fixture().await;

        let err = submit_scores(&fx.state, Vec::new()).await.unwrap_err();
        assert_eq!(message(err), "No scores provided");

        let other_team = ScoreSubmission {
            team_id: Uuid::new_v4(),
            ..hole(&fx, 2, 4)
        };
        let err = submit_scores(&fx.state, vec![hole(&fx, 1, 4), other_team])
            .await
            .unwrap_err();
        assert_eq!(message(err), "All scores must be for the same team and tournament");

        let err = submit_scores(&fx.state, vec![hole(&fx, 1, 4), hole(&fx, 1, 5)])
            .await
            .unwrap_err();
        assert_eq!(message(err), "Hole 1 appears more than once");

        let bad_driver = ScoreSubmission {
            drive_player_id: Uuid::new_v4(),
            ..hole(&fx, 3, 4)
        };
        let err = submit_scores(&fx.state, vec![hole(&fx, 1, 4), hole(&fx, 2, 4), bad_driver])
            .await
            .unwrap_err();
        assert_eq!(message(err), "Drive player not found on this team");

        assert_eq!(fx.store.score_count(), 0);
    }

    #[tokio::test]
    async fn batch_counts_its_own_mulligans_against_the_cap() {
        let fx = fixture().await;
        let rows: Vec<ScoreSubmission> = (1..=4)
            .map(|hole_number| ScoreSubmission {
                mulligan_player_id: Some(fx.ann.id),
                ..hole(&fx, hole_number, 4)
            })
            .collect();

        let err = submit_scores(&fx.state, rows).await.unwrap_err();
        assert!(message(err).starts_with("Ann has no mulligans remaining"));
        assert_eq!(fx.store.score_count(), 0);
    }

    #[tokio::test]
    async fn batch_falls_back_once_without_mulligans() {
        let fx = fixture().await;
        fx.store.deny_mulligan_writes(true);

        let rows = vec![
            hole(&fx, 1, 4),
            ScoreSubmission {
                drive_player_id: fx.bob.id,
                mulligan_player_id: Some(fx.bob.id),
                ..hole(&fx, 2, 3)
            },
        ];
        let outcome = submit_scores(&fx.state, rows).await.unwrap();

        assert!(outcome.is_degraded());
        assert_eq!(outcome.saved.len(), 2);
        assert!(outcome.saved.iter().all(|s| s.mulligan_player_id.is_none()));
        assert_eq!(fx.store.score_count(), 2);
    }
}
