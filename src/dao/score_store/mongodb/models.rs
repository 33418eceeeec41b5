use std::collections::BTreeMap;

use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{MongoDaoError, MongoResult};
use crate::dao::models::{
    PlayerEntity, ScoreEntity, ScoreKey, ScoreUpsert, TeamEntity, TournamentEntity, TournamentType,
};

pub const TOURNAMENT_COLLECTION: &str = "tournaments";
pub const TEAM_COLLECTION: &str = "teams";
pub const PLAYER_COLLECTION: &str = "players";
pub const TEAM_PLAYER_COLLECTION: &str = "team_players";
pub const SCORE_COLLECTION: &str = "scores";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTournamentDocument {
    #[serde(rename = "_id")]
    tournament_type: TournamentType,
    name: String,
    #[serde(default)]
    default_mulligans: i64,
    // BSON documents only take string keys.
    #[serde(default)]
    course_pars: BTreeMap<String, i32>,
}

impl TryFrom<MongoTournamentDocument> for TournamentEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoTournamentDocument) -> MongoResult<Self> {
        let invalid = |kind| MongoDaoError::InvalidDocument {
            collection: TOURNAMENT_COLLECTION,
            id: value.tournament_type.to_string(),
            kind,
        };

        let course_pars = value
            .course_pars
            .iter()
            .map(|(hole, par)| {
                hole.parse::<u8>()
                    .map(|hole| (hole, *par))
                    .map_err(|_| invalid("course_pars key is not a hole number"))
            })
            .collect::<MongoResult<_>>()?;
        let default_mulligans = u32::try_from(value.default_mulligans)
            .map_err(|_| invalid("default_mulligans out of range"))?;

        Ok(Self {
            tournament_type: value.tournament_type,
            name: value.name,
            default_mulligans,
            course_pars,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTeamDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    #[serde(default)]
    handicap: i32,
    tournament_type: TournamentType,
}

impl From<TeamEntity> for MongoTeamDocument {
    fn from(team: TeamEntity) -> Self {
        Self {
            id: team.id.to_string(),
            name: team.name,
            handicap: team.handicap,
            tournament_type: team.tournament_type,
        }
    }
}

impl TryFrom<MongoTeamDocument> for TeamEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoTeamDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_id(TEAM_COLLECTION, &value.id)?,
            name: value.name,
            handicap: value.handicap,
            tournament_type: value.tournament_type,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
}

impl From<PlayerEntity> for MongoPlayerDocument {
    fn from(player: PlayerEntity) -> Self {
        Self {
            id: player.id.to_string(),
            name: player.name,
        }
    }
}

impl TryFrom<MongoPlayerDocument> for PlayerEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoPlayerDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_id(PLAYER_COLLECTION, &value.id)?,
            name: value.name,
        })
    }
}

/// Join row between a team and one of its players; `position` keeps roster order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTeamPlayerDocument {
    pub team_id: String,
    pub player_id: String,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoScoreDocument {
    #[serde(rename = "_id")]
    id: String,
    team_id: String,
    hole_number: i32,
    strokes: i64,
    drive_player_id: String,
    #[serde(default)]
    mulligan_player_id: Option<String>,
    tournament_type: TournamentType,
    created_at: DateTime,
}

impl TryFrom<MongoScoreDocument> for ScoreEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoScoreDocument) -> MongoResult<Self> {
        let invalid = |kind| MongoDaoError::InvalidDocument {
            collection: SCORE_COLLECTION,
            id: value.id.clone(),
            kind,
        };

        Ok(Self {
            id: parse_id(SCORE_COLLECTION, &value.id)?,
            team_id: parse_id(SCORE_COLLECTION, &value.team_id)?,
            hole_number: u8::try_from(value.hole_number)
                .map_err(|_| invalid("hole_number out of range"))?,
            strokes: u32::try_from(value.strokes).map_err(|_| invalid("strokes out of range"))?,
            drive_player_id: parse_id(SCORE_COLLECTION, &value.drive_player_id)?,
            mulligan_player_id: value
                .mulligan_player_id
                .as_deref()
                .map(|id| parse_id(SCORE_COLLECTION, id))
                .transpose()?,
            tournament_type: value.tournament_type,
            created_at: value.created_at.to_system_time(),
        })
    }
}

/// Filter matching the unique (team, hole, tournament) key of a score.
pub fn score_filter(key: ScoreKey) -> Document {
    doc! {
        "team_id": key.team_id.to_string(),
        "hole_number": i32::from(key.hole_number),
        "tournament_type": key.tournament_type.as_str(),
    }
}

/// Update applied by a score upsert; the key fields come from [`score_filter`] on insert.
pub fn score_update(score: &ScoreUpsert) -> Document {
    doc! {
        "$set": {
            "strokes": i64::from(score.strokes),
            "drive_player_id": score.drive_player_id.to_string(),
            "mulligan_player_id": score.mulligan_player_id.map(|id| id.to_string()),
            "created_at": DateTime::from_system_time(score.created_at),
        },
        "$setOnInsert": { "_id": Uuid::new_v4().to_string() },
    }
}

/// Insert-only update creating a tournament the database does not know yet.
pub fn tournament_seed(tournament: &TournamentEntity) -> Document {
    let course_pars: Document = tournament
        .course_pars
        .iter()
        .map(|(hole, par)| (hole.to_string(), (*par).into()))
        .collect();
    doc! {
        "$setOnInsert": {
            "name": tournament.name.as_str(),
            "default_mulligans": i64::from(tournament.default_mulligans),
            "course_pars": course_pars,
        },
    }
}

pub fn id_filter(id: Uuid) -> Document {
    doc! { "_id": id.to_string() }
}

pub fn id_list(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(Uuid::to_string).collect()
}

pub fn parse_id(collection: &'static str, raw: &str) -> MongoResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| MongoDaoError::InvalidDocument {
        collection,
        id: raw.to_owned(),
        kind: "identifier is not a UUID",
    })
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    #[test]
    fn score_update_clears_a_missing_mulligan() {
        let update = score_update(&ScoreUpsert {
            team_id: Uuid::new_v4(),
            hole_number: 4,
            strokes: 3,
            drive_player_id: Uuid::new_v4(),
            mulligan_player_id: None,
            tournament_type: TournamentType::TwoMan,
            created_at: SystemTime::now(),
        });

        let set = update.get_document("$set").unwrap();
        assert!(set.get("mulligan_player_id").unwrap().as_null().is_some());
        assert_eq!(set.get_i64("strokes").unwrap(), 3);
    }

    #[test]
    fn tournament_documents_reject_non_numeric_holes() {
        let document = MongoTournamentDocument {
            tournament_type: TournamentType::FourMan,
            name: "Shamble".into(),
            default_mulligans: 1,
            course_pars: BTreeMap::from([("front".to_string(), 4)]),
        };
        assert!(TournamentEntity::try_from(document).is_err());
    }

    #[test]
    fn tournament_seed_only_writes_on_insert() {
        let tournament = TournamentEntity {
            tournament_type: TournamentType::TwoMan,
            name: "2-Man Scramble".into(),
            default_mulligans: 3,
            course_pars: BTreeMap::from([(1, 4), (2, 3)]),
        };

        let seed = tournament_seed(&tournament);
        assert_eq!(seed.keys().collect::<Vec<_>>(), ["$setOnInsert"]);
        let fields = seed.get_document("$setOnInsert").unwrap();
        assert_eq!(fields.get_str("name").unwrap(), "2-Man Scramble");
        assert_eq!(fields.get_i64("default_mulligans").unwrap(), 3);
        let pars = fields.get_document("course_pars").unwrap();
        assert_eq!(pars.get_i32("2").unwrap(), 3);
    }
}
