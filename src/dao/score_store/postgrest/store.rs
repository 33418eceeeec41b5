use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;
use uuid::Uuid;

use crate::dao::{
    models::{
        PlayerEntity, RosterEntry, ScoreEntity, ScoreUpsert, TeamEntity, TournamentEntity,
        TournamentType,
    },
    score_store::ScoreStore,
    storage::{StorageError, StorageResult},
};

use super::{
    config::PostgrestConfig,
    error::{PostgrestDaoError, PostgrestResult},
    models::{
        ApiErrorBody, PLAYERS_TABLE, PlayerRow, RosterRow, SCORE_CONFLICT_COLUMNS, SCORES_TABLE,
        ScoreRow, ScoreUpsertRow, TEAM_PLAYERS_TABLE, TEAMS_TABLE, TOURNAMENTS_TABLE,
        TeamPlayerInsertRow, TeamRow, TournamentRow, eq, in_list,
    },
};

const ROSTER_SELECT: &str = "team_id,players(id,name)";

/// Score store talking to the Supabase REST API.
#[derive(Clone)]
pub struct PostgrestScoreStore {
    client: Client,
    rest_url: Arc<str>,
    api_key: Arc<str>,
    schema: Option<Arc<str>>,
}

impl PostgrestScoreStore {
    /// Build the HTTP client and check the API answers.
    pub async fn connect(config: PostgrestConfig) -> PostgrestResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| PostgrestDaoError::ClientBuilder { source })?;

        let rest_url = Arc::<str>::from(format!(
            "{}/rest/v1",
            config.base_url.trim_end_matches('/')
        ));

        let store = Self {
            client,
            rest_url,
            api_key: Arc::from(config.api_key),
            schema: config.schema.map(Arc::from),
        };

        store.ping().await?;
        Ok(store)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.rest_url, table);
        let profile_header = if method == Method::GET {
            "Accept-Profile"
        } else {
            "Content-Profile"
        };
        let builder = self
            .client
            .request(method, url)
            .header("apikey", self.api_key.as_ref())
            .bearer_auth(self.api_key.as_ref());

        match self.schema {
            Some(ref schema) => builder.header(profile_header, schema.as_ref()),
            None => builder,
        }
    }

    async fn send(&self, table: &str, builder: RequestBuilder) -> PostgrestResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|source| PostgrestDaoError::RequestSend {
                path: table.to_string(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.json::<ApiErrorBody>().await.unwrap_or_default();
        let message = body
            .message
            .or(body.details)
            .unwrap_or_else(|| status.to_string());
        Err(PostgrestDaoError::Api {
            path: table.to_string(),
            status,
            code: body.code,
            message,
        })
    }

    async fn select<T>(&self, table: &str, query: &[(&str, String)]) -> PostgrestResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let builder = self.request(Method::GET, table).query(query);
        let response = self.send(table, builder).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|source| PostgrestDaoError::DecodeResponse {
                path: table.to_string(),
                source,
            })
    }

    async fn insert<T>(&self, table: &str, rows: &T) -> PostgrestResult<()>
    where
        T: ?Sized + Serialize,
    {
        let builder = self
            .request(Method::POST, table)
            .header("Prefer", "return=minimal")
            .json(rows);
        self.send(table, builder).await.map(|_| ())
    }

    async fn delete(&self, table: &str, query: &[(&str, String)]) -> PostgrestResult<()> {
        let builder = self
            .request(Method::DELETE, table)
            .query(query)
            .header("Prefer", "return=minimal");
        self.send(table, builder).await.map(|_| ())
    }

    async fn upsert_rows(&self, rows: Vec<ScoreUpsert>) -> PostgrestResult<Vec<ScoreEntity>> {
        let body: Vec<ScoreUpsertRow> = rows.into_iter().map(Into::into).collect();
        let builder = self
            .request(Method::POST, SCORES_TABLE)
            .query(&[("on_conflict", SCORE_CONFLICT_COLUMNS)])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&body);

        let response = self.send(SCORES_TABLE, builder).await?;
        let saved = response.json::<Vec<ScoreRow>>().await.map_err(|source| {
            PostgrestDaoError::DecodeResponse {
                path: SCORES_TABLE.to_string(),
                source,
            }
        })?;
        Ok(saved.into_iter().map(Into::into).collect())
    }

    async fn ping(&self) -> PostgrestResult<()> {
        self.select::<serde_json::Value>(
            TOURNAMENTS_TABLE,
            &[("select", "type".into()), ("limit", "1".into())],
        )
        .await
        .map(|_| ())
    }

    async fn tournaments(
        &self,
        filter: Option<TournamentType>,
    ) -> PostgrestResult<Vec<TournamentEntity>> {
        let mut query = vec![("select", "*".to_string()), ("order", "type".to_string())];
        if let Some(tournament_type) = filter {
            query.push(("type", eq(tournament_type)));
        }
        let rows = self.select::<TournamentRow>(TOURNAMENTS_TABLE, &query).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn teams(&self, column: &str, value: String) -> PostgrestResult<Vec<TeamEntity>> {
        let query = [
            ("select", "*".to_string()),
            (column, value),
            ("order", "name".to_string()),
        ];
        let rows = self.select::<TeamRow>(TEAMS_TABLE, &query).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn rosters(&self, tournament_type: TournamentType) -> PostgrestResult<Vec<RosterEntry>> {
        let query = [
            (
                "select",
                format!("{ROSTER_SELECT},teams!inner(tournament_type)"),
            ),
            ("teams.tournament_type", eq(tournament_type)),
            ("order", "id".to_string()),
        ];
        let rows = self.select::<RosterRow>(TEAM_PLAYERS_TABLE, &query).await?;
        Ok(rows.into_iter().filter_map(RosterRow::into_entry).collect())
    }

    async fn roster(&self, team_id: Uuid) -> PostgrestResult<Vec<PlayerEntity>> {
        let query = [
            ("select", ROSTER_SELECT.to_string()),
            ("team_id", eq(team_id)),
            ("order", "id".to_string()),
        ];
        let rows = self.select::<RosterRow>(TEAM_PLAYERS_TABLE, &query).await?;
        Ok(rows
            .into_iter()
            .filter_map(RosterRow::into_entry)
            .map(|entry| entry.player)
            .collect())
    }

    async fn scores(
        &self,
        column: &str,
        value: String,
        order: &str,
    ) -> PostgrestResult<Vec<ScoreEntity>> {
        let query = [
            ("select", "*".to_string()),
            (column, value),
            ("order", order.to_string()),
        ];
        let rows = self.select::<ScoreRow>(SCORES_TABLE, &query).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn save_team(&self, team: TeamEntity, player_ids: Vec<Uuid>) -> PostgrestResult<()> {
        let team_id = team.id;
        self.insert(TEAMS_TABLE, &[TeamRow::from(team)]).await?;

        let members: Vec<TeamPlayerInsertRow> = player_ids
            .into_iter()
            .map(|player_id| TeamPlayerInsertRow { team_id, player_id })
            .collect();
        if members.is_empty() {
            return Ok(());
        }

        // Two requests, no transaction: drop the team again so it never lives without a roster.
        if let Err(err) = self.insert(TEAM_PLAYERS_TABLE, &members).await {
            if let Err(cleanup) = self.delete(TEAMS_TABLE, &[("id", eq(team_id))]).await {
                warn!(
                    %team_id,
                    error = %cleanup,
                    "failed to remove team after roster insert failed"
                );
            }
            return Err(err);
        }
        Ok(())
    }
}

impl ScoreStore for PostgrestScoreStore {
    fn list_tournaments(&self) -> BoxFuture<'static, StorageResult<Vec<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.tournaments(None).await.map_err(Into::into) })
    }

    fn find_tournament(
        &self,
        tournament_type: TournamentType,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut rows = store.tournaments(Some(tournament_type)).await?;
            Ok(rows.pop())
        })
    }

    fn list_teams(
        &self,
        tournament_type: TournamentType,
    ) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .teams("tournament_type", eq(tournament_type))
                .await
                .map_err(Into::into)
        })
    }

    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut rows = store.teams("id", eq(id)).await?;
            Ok(rows.pop())
        })
    }

    fn list_rosters(
        &self,
        tournament_type: TournamentType,
    ) -> BoxFuture<'static, StorageResult<Vec<RosterEntry>>> {
        let store = self.clone();
        Box::pin(async move { store.rosters(tournament_type).await.map_err(Into::into) })
    }

    fn team_roster(&self, team_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.roster(team_id).await.map_err(Into::into) })
    }

    fn list_scores(
        &self,
        tournament_type: TournamentType,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .scores("tournament_type", eq(tournament_type), "team_id,hole_number")
                .await
                .map_err(Into::into)
        })
    }

    fn team_scores(&self, team_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .scores("team_id", eq(team_id), "hole_number")
                .await
                .map_err(Into::into)
        })
    }

    fn upsert_score(&self, score: ScoreUpsert) -> BoxFuture<'static, StorageResult<ScoreEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let mut saved = store.upsert_rows(vec![score]).await?;
            saved.pop().ok_or_else(|| {
                StorageError::from(PostgrestDaoError::MissingRow {
                    path: SCORES_TABLE.to_string(),
                })
            })
        })
    }

    fn upsert_scores(
        &self,
        scores: Vec<ScoreUpsert>,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_rows(scores).await.map_err(Into::into) })
    }

    fn find_players(
        &self,
        ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let query = [("select", "id,name".to_string()), ("id", in_list(&ids))];
            let rows = store.select::<PlayerRow>(PLAYERS_TABLE, &query).await?;
            Ok(rows.into_iter().map(Into::into).collect())
        })
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .insert(PLAYERS_TABLE, &[PlayerRow::from(player)])
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
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        // PostgREST is stateless over HTTP: reconnecting is a fresh round-trip.
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use axum::{
        Json, Router,
        extract::{RawQuery, State},
        http::StatusCode,
        routing::{get, post},
    };
    use serde_json::{Value, json};

    use super::*;

    type Calls = Arc<Mutex<Vec<String>>>;

    /// Local stand-in for PostgREST whose `team_players` table refuses every insert.
    async fn refusing_roster_api() -> (PostgrestScoreStore, Calls) {
        let calls: Calls = Arc::default();

        async fn tournaments() -> Json<Value> {
            Json(json!([]))
        }
        async fn insert_team(State(calls): State<Calls>) -> StatusCode {
            calls.lock().unwrap().push("POST teams".into());
            StatusCode::CREATED
        }
        async fn delete_team(State(calls): State<Calls>, RawQuery(query): RawQuery) -> StatusCode {
            calls
                .lock()
                .unwrap()
                .push(format!("DELETE teams {}", query.unwrap_or_default()));
            StatusCode::NO_CONTENT
        }
        async fn insert_members(State(calls): State<Calls>) -> (StatusCode, Json<Value>) {
            calls.lock().unwrap().push("POST team_players".into());
            (
                StatusCode::CONFLICT,
                Json(json!({
                    "code": "23503",
                    "message": "insert on table \"team_players\" violates foreign key constraint"
                })),
            )
        }

        let app = Router::new()
            .route("/rest/v1/tournaments", get(tournaments))
            .route("/rest/v1/teams", post(insert_team).delete(delete_team))
            .route("/rest/v1/team_players", post(insert_members))
            .with_state(calls.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let config = PostgrestConfig::new(format!("http://{addr}"), "anon-key");
        let store = PostgrestScoreStore::connect(config).await.unwrap();
        (store, calls)
    }

    #[tokio::test]
    async fn team_is_removed_when_its_roster_cannot_be_saved() {
        let (store, calls) = refusing_roster_api().await;
        let team = TeamEntity {
            id: Uuid::new_v4(),
            name: "Orphans".into(),
            handicap: 0,
            tournament_type: TournamentType::TwoMan,
        };

        let players = vec![Uuid::new_v4(), Uuid::new_v4()];
        let err = ScoreStore::save_team(&store, team.clone(), players)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StorageError::Rejected { ref message } if message.contains("foreign key")
        ));
        assert_eq!(
            *calls.lock().unwrap(),
            [
                "POST teams".to_string(),
                "POST team_players".to_string(),
                format!("DELETE teams id=eq.{}", team.id),
            ]
        );
    }
}
