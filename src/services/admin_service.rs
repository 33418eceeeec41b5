//! Business logic powering the admin REST routes: registering players and teams.

use std::collections::{HashMap, HashSet};

use futures::try_join;
use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{PlayerEntity, TeamEntity},
    dto::{
        admin::{CreatePlayerRequest, CreateTeamRequest},
        tournament::{PlayerSummary, TeamSummary},
    },
    error::ServiceError,
    state::SharedState,
};

/// Register a new player.
pub async fn create_player(
    state: &SharedState,
    request: CreatePlayerRequest,
) -> Result<PlayerSummary, ServiceError> {
    let store = state.require_score_store().await?;
    let player = PlayerEntity {
        id: Uuid::new_v4(),
        name: request.name.trim().to_owned(),
    };

    store.save_player(player.clone()).await?;
    info!(player_id = %player.id, "player created");
    Ok(player.into())
}

/// Register a team with a full roster of existing players.
pub async fn create_team(
    state: &SharedState,
    request: CreateTeamRequest,
) -> Result<TeamSummary, ServiceError> {
    let tournament_type = request.tournament_type;
    let team_size = tournament_type.team_size();

    if request.player_ids.len() != team_size {
        return Err(ServiceError::InvalidInput(format!(
            "A {tournament_type} team needs exactly {team_size} players"
        )));
    }
    let distinct: HashSet<Uuid> = request.player_ids.iter().copied().collect();
    if distinct.len() != request.player_ids.len() {
        return Err(ServiceError::InvalidInput(
            "A player can only appear once on a team".into(),
        ));
    }

    let store = state.require_score_store().await?;
    let (tournament, players) = try_join!(
        store.find_tournament(tournament_type),
        store.find_players(request.player_ids.clone()),
    )?;
    if tournament.is_none() {
        return Err(ServiceError::NotFound(format!(
            "Tournament not found: {tournament_type}"
        )));
    }

    let mut players: HashMap<Uuid, PlayerEntity> =
        players.into_iter().map(|player| (player.id, player)).collect();
    let roster = request
        .player_ids
        .iter()
        .map(|id| {
            players
                .remove(id)
                .ok_or_else(|| ServiceError::InvalidInput(format!("Player not found: {id}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let team = TeamEntity {
        id: Uuid::new_v4(),
        name: request.name.trim().to_owned(),
        handicap: request.handicap,
        tournament_type,
    };
    store.save_team(team.clone(), request.player_ids).await?;
    info!(team_id = %team.id, tournament = %tournament_type, "team created");

    Ok(TeamSummary::from_parts(team, roster))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::models::TournamentType, dao::score_store::MemoryScoreStore,
        state::AppState,
    };

    async fn state() -> SharedState {
        let config = AppConfig::default();
        let store = MemoryScoreStore::new();
        store.seed_tournaments(config.tournaments().iter().cloned());
        let state = AppState::new(config, Some("secret".into()));
        state.set_score_store(Arc::new(store)).await;
        state
    }

    async fn player(state: &SharedState, name: &str) -> Uuid {
        create_player(state, CreatePlayerRequest { name: name.into() })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn creates_a_team_with_its_roster_in_order() {
        let state = state().await;
        let gus = player(&state, "Gus").await;
        let hal = player(&state, "Hal").await;

        let team = create_team(
            &state,
            CreateTeamRequest {
                name: " Two Putts ".into(),
                handicap: 3,
                tournament_type: TournamentType::TwoMan,
                player_ids: vec![hal, gus],
            },
        )
        .await
        .unwrap();

        assert_eq!(team.name, "Two Putts");
        let ids: Vec<Uuid> = team.players.iter().map(|p| p.id).collect();
        assert_eq!(ids, [hal, gus]);
    }

    #[tokio::test]
    async fn roster_must_match_the_team_size() {
        let state = state().await;
        let gus = player(&state, "Gus").await;

        let err = create_team(
            &state,
            CreateTeamRequest {
                name: "Short Handed".into(),
                handicap: 0,
                tournament_type: TournamentType::FourMan,
                player_ids: vec![gus],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(ref m) if m.contains("exactly 4")));

        let err = create_team(
            &state,
            CreateTeamRequest {
                name: "Twins".into(),
                handicap: 0,
                tournament_type: TournamentType::TwoMan,
                player_ids: vec![gus, gus],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn unknown_players_are_rejected() {
        let state = state().await;
        let gus = player(&state, "Gus").await;
        let ghost = Uuid::new_v4();

        let err = create_team(
            &state,
            CreateTeamRequest {
                name: "Ghosts".into(),
                handicap: 0,
                tournament_type: TournamentType::TwoMan,
                player_ids: vec![gus, ghost],
            },
        )
        .await
        .unwrap_err();
        let expected = format!("Player not found: {ghost}");
        assert!(matches!(err, ServiceError::InvalidInput(ref m) if *m == expected));
    }
}
