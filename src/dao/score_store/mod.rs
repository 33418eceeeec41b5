/// In-memory backend.
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;
/// Supabase/PostgREST backend.
#[cfg(feature = "postgrest-store")]
pub mod postgrest;

use std::sync::Arc;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::{
    config::{AppConfig, StoreBackend},
    dao::{
        models::{
            PlayerEntity, RosterEntry, ScoreEntity, ScoreUpsert, TeamEntity, TournamentEntity,
            TournamentType,
        },
        storage::StorageResult,
    },
};

pub use memory::MemoryScoreStore;

/// Abstraction over the store holding tournaments, teams, rosters and scores.
pub trait ScoreStore: Send + Sync {
    /// Every tournament, ordered by type.
    fn list_tournaments(&self) -> BoxFuture<'static, StorageResult<Vec<TournamentEntity>>>;
    /// Tournament of the given type, if configured.
    fn find_tournament(
        &self,
        tournament_type: TournamentType,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>>;
    /// Teams of a tournament ordered by name.
    fn list_teams(
        &self,
        tournament_type: TournamentType,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>>;
    /// Team by id.
    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>>;
    /// Roster entries of every team playing `tournament_type`, in join-table order.
    fn list_rosters(
        &self,
        tournament_type: TournamentType,
    ) -> BoxFuture<'static, StorageResult<Vec<RosterEntry>>>;
    /// Players of one team in roster order.
    fn team_roster(&self, team_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    /// Scores of a tournament ordered by team then hole.
    fn list_scores(
        &self,
        tournament_type: TournamentType,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>>;
    /// Scores of one team ordered by hole.
    fn team_scores(&self, team_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>>;
    /// Insert or replace the row keyed by (team, hole, tournament).
    fn upsert_score(&self, score: ScoreUpsert) -> BoxFuture<'static, StorageResult<ScoreEntity>>;
    /// Bulk variant of [`ScoreStore::upsert_score`].
    fn upsert_scores(
        &self,
        scores: Vec<ScoreUpsert>,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>>;
    /// Players among `ids` that exist; unknown ids are skipped.
    fn find_players(&self, ids: Vec<Uuid>)
    -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    /// Persist a new player.
    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Persist a team and its roster, players listed in roster order.
    fn save_team(
        &self,
        team: TeamEntity,
        player_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Cheap round-trip proving the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Connect to the backend selected by `backend`.
pub async fn connect(
    backend: StoreBackend,
    config: &AppConfig,
) -> StorageResult<Arc<dyn ScoreStore>> {
    match backend {
        StoreBackend::Memory => {
            let store = MemoryScoreStore::new();
            store.seed_tournaments(config.tournaments().iter().cloned());
            Ok(Arc::new(store))
        }
        #[cfg(feature = "postgrest-store")]
        StoreBackend::Postgrest => {
            let config = postgrest::PostgrestConfig::from_env()?;
            let store = postgrest::PostgrestScoreStore::connect(config).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgrest-store"))]
        StoreBackend::Postgrest => Err(crate::dao::storage::StorageError::Unsupported {
            backend: "postgrest",
        }),
        #[cfg(feature = "mongo-store")]
        StoreBackend::Mongo => {
            let mongo = self::mongodb::MongoConfig::from_env().await?;
            let store = self::mongodb::MongoScoreStore::connect(mongo).await?;
            store
                .seed_tournaments(config.tournaments().iter().cloned())
                .await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "mongo-store"))]
        StoreBackend::Mongo => {
            Err(crate::dao::storage::StorageError::Unsupported { backend: "mongo" })
        }
    }
}
