//! In-process [`ScoreStore`] backed by concurrent maps, used for local runs and tests.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{
        PlayerEntity, RosterEntry, ScoreEntity, ScoreKey, ScoreUpsert, TeamEntity,
        TournamentEntity, TournamentType,
    },
    score_store::ScoreStore,
    storage::{StorageError, StorageResult},
};

/// Message used when mulligan writes are refused, mirroring the hosted store wording.
const ROW_LEVEL_SECURITY_MESSAGE: &str =
    "new row violates row-level security policy for table \"scores\"";

/// Score store kept in process memory; clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryScoreStore {
    inner: Arc<MemoryTables>,
}

#[derive(Default)]
struct MemoryTables {
    tournaments: DashMap<TournamentType, TournamentEntity>,
    teams: DashMap<Uuid, TeamEntity>,
    players: DashMap<Uuid, PlayerEntity>,
    rosters: DashMap<Uuid, Vec<Uuid>>,
    scores: DashMap<ScoreKey, ScoreEntity>,
    deny_mulligan_writes: AtomicBool,
    // Serialises writers so a bulk upsert lands all-or-nothing.
    write_gate: Mutex<()>,
}

impl MemoryScoreStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace tournament definitions.
    pub fn seed_tournaments(&self, tournaments: impl IntoIterator<Item = TournamentEntity>) {
        for tournament in tournaments {
            self.inner
                .tournaments
                .insert(tournament.tournament_type, tournament);
        }
    }

    /// Refuse every score write carrying a mulligan, like a row-level security policy would.
    pub fn deny_mulligan_writes(&self, deny: bool) {
        self.inner
            .deny_mulligan_writes
            .store(deny, Ordering::SeqCst);
    }

    /// Number of stored score rows.
    pub fn score_count(&self) -> usize {
        self.inner.scores.len()
    }

    fn sorted_teams(&self, tournament_type: TournamentType) -> Vec<TeamEntity> {
        let mut teams: Vec<TeamEntity> = self
            .inner
            .teams
            .iter()
            .filter(|team| team.tournament_type == tournament_type)
            .map(|team| team.value().clone())
            .collect();
        teams.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        teams
    }

    fn roster_of(&self, team_id: Uuid) -> Vec<PlayerEntity> {
        let player_ids = self
            .inner
            .rosters
            .get(&team_id)
            .map(|ids| ids.value().clone())
            .unwrap_or_default();

        player_ids
            .into_iter()
            .filter_map(|id| self.inner.players.get(&id).map(|p| p.value().clone()))
            .collect()
    }

    fn check_write(&self, score: &ScoreUpsert) -> StorageResult<()> {
        if score.mulligan_player_id.is_some()
            && self.inner.deny_mulligan_writes.load(Ordering::SeqCst)
        {
            return Err(StorageError::PermissionDenied {
                message: ROW_LEVEL_SECURITY_MESSAGE.into(),
            });
        }

        if !self.inner.teams.contains_key(&score.team_id) {
            return Err(StorageError::Rejected {
                message: format!(
                    "insert or update on table \"scores\" violates foreign key constraint: team {} does not exist",
                    score.team_id
                ),
            });
        }

        Ok(())
    }

    fn write(&self, score: ScoreUpsert) -> ScoreEntity {
        let key = score.key();
        let id = self
            .inner
            .scores
            .get(&key)
            .map(|row| row.id)
            .unwrap_or_else(Uuid::new_v4);
        let entity = score.into_entity(id);
        self.inner.scores.insert(key, entity.clone());
        entity
    }

    fn upsert_all(&self, scores: Vec<ScoreUpsert>) -> StorageResult<Vec<ScoreEntity>> {
        let _gate = self
            .inner
            .write_gate
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        for score in &scores {
            self.check_write(score)?;
        }

        Ok(scores.into_iter().map(|score| self.write(score)).collect())
    }

    fn scores_where(&self, keep: impl Fn(&ScoreEntity) -> bool) -> Vec<ScoreEntity> {
        let mut scores: Vec<ScoreEntity> = self
            .inner
            .scores
            .iter()
            .filter(|row| keep(row.value()))
            .map(|row| row.value().clone())
            .collect();
        scores.sort_by_key(|score| (score.team_id, score.hole_number));
        scores
    }
}

impl ScoreStore for MemoryScoreStore {
    fn list_tournaments(&self) -> BoxFuture<'static, StorageResult<Vec<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tournaments: Vec<TournamentEntity> = store
                .inner
                .tournaments
                .iter()
                .map(|entry| entry.value().clone())
                .collect();
            tournaments.sort_by_key(|t| t.tournament_type);
            Ok(tournaments)
        })
    }

    fn find_tournament(
        &self,
        tournament_type: TournamentType,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .tournaments
                .get(&tournament_type)
                .map(|entry| entry.value().clone()))
        })
    }

    fn list_teams(
        &self,
        tournament_type: TournamentType,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.sorted_teams(tournament_type)) })
    }

    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.teams.get(&id).map(|t| t.value().clone())) })
    }

    fn list_rosters(
        &self,
        tournament_type: TournamentType,
    ) -> BoxFuture<'static, StorageResult<Vec<RosterEntry>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .sorted_teams(tournament_type)
                .into_iter()
                .flat_map(|team| {
                    store
                        .roster_of(team.id)
                        .into_iter()
                        .map(move |player| RosterEntry {
                            team_id: team.id,
                            player,
                        })
                })
                .collect())
        })
    }

    fn team_roster(&self, team_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.roster_of(team_id)) })
    }

    fn list_scores(
        &self,
        tournament_type: TournamentType,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store.scores_where(|score| score.tournament_type == tournament_type))
        })
    }

    fn team_scores(&self, team_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.scores_where(|score| score.team_id == team_id)) })
    }

    fn upsert_score(&self, score: ScoreUpsert) -> BoxFuture<'static, StorageResult<ScoreEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let mut saved = store.upsert_all(vec![score])?;
            saved.pop().ok_or_else(|| StorageError::Rejected {
                message: "upsert returned no row".into(),
            })
        })
    }

    fn upsert_scores(
        &self,
        scores: Vec<ScoreUpsert>,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_all(scores) })
    }

    fn find_players(
        &self,
        ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(ids
                .iter()
                .filter_map(|id| store.inner.players.get(id).map(|p| p.value().clone()))
                .collect())
        })
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.players.insert(player.id, player);
            Ok(())
        })
    }

    fn save_team(
        &self,
        team: TeamEntity,
        player_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            if let Some(missing) = player_ids
                .iter()
                .find(|id| !store.inner.players.contains_key(id))
            {
                return Err(StorageError::Rejected {
                    message: format!(
                        "insert or update on table \"team_players\" violates foreign key constraint: player {missing} does not exist"
                    ),
                });
            }

            store.inner.rosters.insert(team.id, player_ids);
            store.inner.teams.insert(team.id, team);
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
