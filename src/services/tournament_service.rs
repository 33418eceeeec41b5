use std::collections::HashMap;

use futures::try_join;
use uuid::Uuid;

use crate::{
    dao::models::{PlayerEntity, TeamEntity, TournamentType},
    dto::tournament::{
        ScoreSummary, TeamDrivesResponse, TeamMulligansResponse, TeamSummary, TournamentSummary,
    },
    error::ServiceError,
    services::{
        formatting::meets_minimum_drives,
        leaderboard::{tally_drives, tally_mulligans},
    },
    state::SharedState,
};

fn team_not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Team not found: {id}"))
}

/// Every configured tournament.
pub async fn list_tournaments(state: &SharedState) -> Result<Vec<TournamentSummary>, ServiceError> {
    let store = state.require_score_store().await?;
    let tournaments = store.list_tournaments().await?;
    Ok(tournaments.into_iter().map(Into::into).collect())
}

/// One tournament by type.
pub async fn get_tournament(
    state: &SharedState,
    tournament_type: TournamentType,
) -> Result<TournamentSummary, ServiceError> {
    let store = state.require_score_store().await?;
    store
        .find_tournament(tournament_type)
        .await?
        .map(Into::into)
        .ok_or_else(|| ServiceError::NotFound(format!("Tournament not found: {tournament_type}")))
}

/// Teams of a tournament with their rosters, sorted by name.
pub async fn list_teams(
    state: &SharedState,
    tournament_type: TournamentType,
) -> Result<Vec<TeamSummary>, ServiceError> {
    let store = state.require_score_store().await?;
    let (teams, rosters) = try_join!(
        store.list_teams(tournament_type),
        store.list_rosters(tournament_type),
    )?;

    let mut by_team: HashMap<Uuid, Vec<PlayerEntity>> = HashMap::new();
    for entry in rosters {
        by_team.entry(entry.team_id).or_default().push(entry.player);
    }

    Ok(teams
        .into_iter()
        .map(|team| {
            let roster = by_team.remove(&team.id).unwrap_or_default();
            TeamSummary::from_parts(team, roster)
        })
        .collect())
}

async fn team_with_roster(
    state: &SharedState,
    id: Uuid,
) -> Result<(TeamEntity, Vec<PlayerEntity>), ServiceError> {
    let store = state.require_score_store().await?;
    let (team, roster) = try_join!(store.find_team(id), store.team_roster(id))?;
    let team = team.ok_or_else(|| team_not_found(id))?;
    Ok((team, roster))
}

/// Team with its roster in roster order.
pub async fn get_team(state: &SharedState, id: Uuid) -> Result<TeamSummary, ServiceError> {
    let (team, roster) = team_with_roster(state, id).await?;
    Ok(TeamSummary::from_parts(team, roster))
}

/// Scores of a team ordered by hole.
pub async fn get_team_scores(
    state: &SharedState,
    id: Uuid,
) -> Result<Vec<ScoreSummary>, ServiceError> {
    let store = state.require_score_store().await?;
    let (team, scores) = try_join!(store.find_team(id), store.team_scores(id))?;
    team.ok_or_else(|| team_not_found(id))?;
    Ok(scores.into_iter().map(Into::into).collect())
}

/// Drives per rostered player of a team, with the minimum-drive check.
pub async fn get_team_drive_counts(
    state: &SharedState,
    id: Uuid,
) -> Result<TeamDrivesResponse, ServiceError> {
    let (team, roster) = team_with_roster(state, id).await?;
    let store = state.require_score_store().await?;
    let scores = store.team_scores(id).await?;

    let minimum_drives = state.config().minimum_drives(team.tournament_type);
    let drive_counts = tally_drives(&roster, &scores);
    Ok(TeamDrivesResponse {
        team_id: id,
        minimum_drives,
        meets_minimum_drives: meets_minimum_drives(&drive_counts, minimum_drives),
        drive_counts: drive_counts.into_iter().map(Into::into).collect(),
    })
}

/// Mulligans used and remaining per rostered player of a team.
pub async fn get_team_mulligan_counts(
    state: &SharedState,
    id: Uuid,
) -> Result<TeamMulligansResponse, ServiceError> {
    let (team, roster) = team_with_roster(state, id).await?;
    let store = state.require_score_store().await?;
    let (tournament, scores) = try_join!(
        store.find_tournament(team.tournament_type),
        store.team_scores(id),
    )?;

    let allowance = tournament.map_or(0, |tournament| tournament.default_mulligans);
    let mulligan_counts = tally_mulligans(&roster, &scores, allowance);
    Ok(TeamMulligansResponse {
        team_id: id,
        total_remaining_mulligans: mulligan_counts.iter().map(|count| count.remaining).sum(),
        mulligan_counts: mulligan_counts.into_iter().map(Into::into).collect(),
    })
}
