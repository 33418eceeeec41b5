use std::{collections::HashMap, sync::Arc};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::doc,
    options::{IndexOptions, ReturnDocument},
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoPlayerDocument, MongoScoreDocument, MongoTeamDocument, MongoTeamPlayerDocument,
        MongoTournamentDocument, PLAYER_COLLECTION, SCORE_COLLECTION, TEAM_COLLECTION,
        TEAM_PLAYER_COLLECTION, TOURNAMENT_COLLECTION, id_filter, id_list, parse_id, score_filter,
        score_update, tournament_seed,
    },
};
use crate::dao::{
    models::{
        PlayerEntity, RosterEntry, ScoreEntity, ScoreUpsert, TeamEntity, TournamentEntity,
        TournamentType,
    },
    score_store::ScoreStore,
    storage::StorageResult,
};

/// Score store over a MongoDB database, reconnecting in place.
#[derive(Clone)]
pub struct MongoScoreStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) = self.config.open().await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoScoreStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) = config.open().await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let scores = self.collection::<mongodb::bson::Document>(SCORE_COLLECTION).await;
        let score_key = IndexModel::builder()
            .keys(doc! {"team_id": 1, "hole_number": 1, "tournament_type": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("score_key_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();

        scores
            .create_index(score_key)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SCORE_COLLECTION,
                index: "team_id,hole_number,tournament_type",
                source,
            })?;

        let members = self
            .collection::<mongodb::bson::Document>(TEAM_PLAYER_COLLECTION)
            .await;
        let member_key = IndexModel::builder()
            .keys(doc! {"team_id": 1, "player_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("team_player_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();

        members
            .create_index(member_key)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: TEAM_PLAYER_COLLECTION,
                index: "team_id,player_id",
                source,
            })?;

        Ok(())
    }

    /// Create the configured tournaments that are missing; existing ones are left untouched.
    pub async fn seed_tournaments(
        &self,
        tournaments: impl IntoIterator<Item = TournamentEntity>,
    ) -> MongoResult<()> {
        let collection = self
            .collection::<mongodb::bson::Document>(TOURNAMENT_COLLECTION)
            .await;
        for tournament in tournaments {
            collection
                .update_one(
                    doc! {"_id": tournament.tournament_type.as_str()},
                    tournament_seed(&tournament),
                )
                .upsert(true)
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: TOURNAMENT_COLLECTION,
                    source,
                })?;
        }
        Ok(())
    }

    async fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        let guard = self.inner.state.read().await;
        guard.database.collection::<T>(name)
    }

    async fn find_all<T>(
        &self,
        collection: &'static str,
        filter: mongodb::bson::Document,
        sort: mongodb::bson::Document,
    ) -> MongoResult<Vec<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        self.collection::<T>(collection)
            .await
            .find(filter)
            .sort(sort)
            .await
            .map_err(|source| MongoDaoError::Query { collection, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Query { collection, source })
    }

    async fn insert_all<T>(&self, collection: &'static str, documents: Vec<T>) -> MongoResult<()>
    where
        T: Serialize + Send + Sync,
    {
        if documents.is_empty() {
            return Ok(());
        }
        self.collection::<T>(collection)
            .await
            .insert_many(documents)
            .await
            .map_err(|source| MongoDaoError::Write { collection, source })?;
        Ok(())
    }

    async fn tournaments(
        &self,
        filter: mongodb::bson::Document,
    ) -> MongoResult<Vec<TournamentEntity>> {
        self.find_all::<MongoTournamentDocument>(TOURNAMENT_COLLECTION, filter, doc! {"_id": 1})
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    async fn teams(&self, filter: mongodb::bson::Document) -> MongoResult<Vec<TeamEntity>> {
        self.find_all::<MongoTeamDocument>(TEAM_COLLECTION, filter, doc! {"name": 1})
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    async fn players(&self, ids: &[Uuid]) -> MongoResult<Vec<PlayerEntity>> {
        self.find_all::<MongoPlayerDocument>(
            PLAYER_COLLECTION,
            doc! {"_id": {"$in": id_list(ids)}},
            doc! {"name": 1},
        )
        .await?
        .into_iter()
        .map(TryInto::try_into)
        .collect()
    }

    /// Roster entries of `teams`, ordered by team then roster position.
    async fn rosters(&self, teams: &[TeamEntity]) -> MongoResult<Vec<RosterEntry>> {
        let team_ids: Vec<Uuid> = teams.iter().map(|team| team.id).collect();
        let members = self
            .find_all::<MongoTeamPlayerDocument>(
                TEAM_PLAYER_COLLECTION,
                doc! {"team_id": {"$in": id_list(&team_ids)}},
                doc! {"position": 1},
            )
            .await?;

        let player_ids = members
            .iter()
            .map(|member| parse_id(TEAM_PLAYER_COLLECTION, &member.player_id))
            .collect::<MongoResult<Vec<_>>>()?;
        let players: HashMap<Uuid, PlayerEntity> = self
            .players(&player_ids)
            .await?
            .into_iter()
            .map(|player| (player.id, player))
            .collect();

        let mut entries = Vec::with_capacity(members.len());
        for team_id in team_ids {
            for member in &members {
                if parse_id(TEAM_PLAYER_COLLECTION, &member.team_id)? != team_id {
                    continue;
                }
                let player_id = parse_id(TEAM_PLAYER_COLLECTION, &member.player_id)?;
                if let Some(player) = players.get(&player_id) {
                    entries.push(RosterEntry {
                        team_id,
                        player: player.clone(),
                    });
                }
            }
        }
        Ok(entries)
    }

    async fn scores(
        &self,
        filter: mongodb::bson::Document,
        sort: mongodb::bson::Document,
    ) -> MongoResult<Vec<ScoreEntity>> {
        self.find_all::<MongoScoreDocument>(SCORE_COLLECTION, filter, sort)
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    async fn upsert_score(&self, score: ScoreUpsert) -> MongoResult<ScoreEntity> {
        let collection = self.collection::<MongoScoreDocument>(SCORE_COLLECTION).await;
        let document = collection
            .find_one_and_update(score_filter(score.key()), score_update(&score))
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: SCORE_COLLECTION,
                source,
            })?
            .ok_or_else(|| MongoDaoError::InvalidDocument {
                collection: SCORE_COLLECTION,
                id: format!("{}#{}", score.team_id, score.hole_number),
                kind: "upsert returned no document",
            })?;

        document.try_into()
    }

    // Rows are upserted one by one: a failure part-way leaves earlier holes written.
    async fn upsert_scores(&self, scores: Vec<ScoreUpsert>) -> MongoResult<Vec<ScoreEntity>> {
        let mut saved = Vec::with_capacity(scores.len());
        for score in scores {
            saved.push(self.upsert_score(score).await?);
        }
        Ok(saved)
    }

    async fn save_team(&self, team: TeamEntity, player_ids: Vec<Uuid>) -> MongoResult<()> {
        let team_id = team.id.to_string();
        self.insert_all(TEAM_COLLECTION, vec![MongoTeamDocument::from(team)])
            .await?;

        let members = player_ids
            .into_iter()
            .enumerate()
            .map(|(position, player_id)| MongoTeamPlayerDocument {
                team_id: team_id.clone(),
                player_id: player_id.to_string(),
                position: position as i32,
            })
            .collect();
        if let Err(err) = self.insert_all(TEAM_PLAYER_COLLECTION, members).await {
            self.remove_team(&team_id).await;
            return Err(err);
        }
        Ok(())
    }

    /// Undo a half-written team: members inserted before the failure, then the team itself.
    async fn remove_team(&self, team_id: &str) {
        let members = self
            .collection::<mongodb::bson::Document>(TEAM_PLAYER_COLLECTION)
            .await
            .delete_many(doc! {"team_id": team_id})
            .await;
        let team = self
            .collection::<mongodb::bson::Document>(TEAM_COLLECTION)
            .await
            .delete_one(doc! {"_id": team_id})
            .await;
        if let Err(err) = members.and(team) {
            warn!(%team_id, error = %err, "failed to remove team after roster insert failed");
        }
    }
}

impl ScoreStore for MongoScoreStore {
    fn list_tournaments(&self) -> BoxFuture<'static, StorageResult<Vec<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.tournaments(doc! {}).await.map_err(Into::into) })
    }

    fn find_tournament(
        &self,
        tournament_type: TournamentType,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut found = store
                .tournaments(doc! {"_id": tournament_type.as_str()})
                .await?;
            Ok(found.pop())
        })
    }

    fn list_teams(
        &self,
        tournament_type: TournamentType,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .teams(doc! {"tournament_type": tournament_type.as_str()})
                .await
                .map_err(Into::into)
        })
    }

    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut found = store.teams(id_filter(id)).await?;
            Ok(found.pop())
        })
    }

    fn list_rosters(
        &self,
        tournament_type: TournamentType,
    ) -> BoxFuture<'static, StorageResult<Vec<RosterEntry>>> {
        let store = self.clone();
        Box::pin(async move {
            let teams = store
                .teams(doc! {"tournament_type": tournament_type.as_str()})
                .await?;
            store.rosters(&teams).await.map_err(Into::into)
        })
    }

    fn team_roster(&self, team_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let teams = store.teams(id_filter(team_id)).await?;
            let entries = store.rosters(&teams).await?;
            Ok(entries.into_iter().map(|entry| entry.player).collect())
        })
    }

    fn list_scores(
        &self,
        tournament_type: TournamentType,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .scores(
                    doc! {"tournament_type": tournament_type.as_str()},
                    doc! {"team_id": 1, "hole_number": 1},
                )
                .await
                .map_err(Into::into)
        })
    }

    fn team_scores(&self, team_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .scores(
                    doc! {"team_id": team_id.to_string()},
                    doc! {"hole_number": 1},
                )
                .await
                .map_err(Into::into)
        })
    }

    fn upsert_score(&self, score: ScoreUpsert) -> BoxFuture<'static, StorageResult<ScoreEntity>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_score(score).await.map_err(Into::into) })
    }

    fn upsert_scores(
        &self,
        scores: Vec<ScoreUpsert>,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_scores(scores).await.map_err(Into::into) })
    }

    fn find_players(
        &self,
        ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.players(&ids).await.map_err(Into::into) })
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .insert_all(PLAYER_COLLECTION, vec![MongoPlayerDocument::from(player)])
                .await
                .map_err(Into::into)
        })
    }

    fn save_team(
        &self,
        team: TeamEntity,
        player_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_team(team, player_ids).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
