//! Application-level configuration loading: tournament definitions, drive requirements and the
//! runtime settings read from the environment.

use std::{collections::BTreeMap, env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::dao::models::{CoursePars, TournamentEntity, TournamentType};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SCRAMBLE_BOARD_CONFIG_PATH";
/// Environment variable selecting the storage backend.
const STORE_BACKEND_ENV: &str = "STORE_BACKEND";
/// Environment variable holding the token expected on admin routes.
const ADMIN_TOKEN_ENV: &str = "ADMIN_TOKEN";

/// Par of holes 1 to 18 on the built-in course.
const DEFAULT_PARS: [i32; 18] = [4, 4, 3, 5, 4, 4, 3, 4, 5, 4, 3, 5, 4, 4, 3, 4, 5, 4];

/// Storage backend the server connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgREST / Supabase REST API.
    Postgrest,
    /// MongoDB deployment.
    Mongo,
    /// In-process store seeded from the configuration.
    Memory,
}

impl StoreBackend {
    /// Read the backend from `STORE_BACKEND`, defaulting to PostgREST.
    pub fn from_env() -> Self {
        match env::var(STORE_BACKEND_ENV) {
            Ok(value) => Self::parse(&value).unwrap_or_else(|| {
                warn!(value = %value, "unknown store backend; using postgrest");
                StoreBackend::Postgrest
            }),
            Err(_) => StoreBackend::Postgrest,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgrest" | "supabase" => Some(StoreBackend::Postgrest),
            "mongo" | "mongodb" => Some(StoreBackend::Mongo),
            "memory" => Some(StoreBackend::Memory),
            _ => None,
        }
    }

    /// Name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            StoreBackend::Postgrest => "postgrest",
            StoreBackend::Mongo => "mongo",
            StoreBackend::Memory => "memory",
        }
    }
}

/// Token expected in the `x-admin-token` header, taken from `ADMIN_TOKEN`.
pub fn admin_token_from_env() -> Option<String> {
    env::var(ADMIN_TOKEN_ENV)
        .ok()
        .map(|token| token.trim().to_owned())
        .filter(|token| !token.is_empty())
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    tournaments: Vec<TournamentEntity>,
    minimum_drives: BTreeMap<TournamentType, u32>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the built-in tournaments.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        tournaments = app_config.tournaments.len(),
                        "loaded tournament configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Tournaments used to seed stores that start empty.
    pub fn tournaments(&self) -> &[TournamentEntity] {
        &self.tournaments
    }

    /// Drives every player must contribute over the round.
    pub fn minimum_drives(&self, tournament_type: TournamentType) -> u32 {
        self.minimum_drives
            .get(&tournament_type)
            .copied()
            .unwrap_or_else(|| default_minimum_drives(tournament_type))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tournaments: TournamentType::ALL
                .into_iter()
                .map(default_tournament)
                .collect(),
            minimum_drives: TournamentType::ALL
                .into_iter()
                .map(|ty| (ty, default_minimum_drives(ty)))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    tournaments: Vec<RawTournament>,
    #[serde(default)]
    minimum_drives: BTreeMap<TournamentType, u32>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let mut config = AppConfig::default();
        for raw in value.tournaments {
            let tournament = TournamentEntity::from(raw);
            match config
                .tournaments
                .iter_mut()
                .find(|existing| existing.tournament_type == tournament.tournament_type)
            {
                Some(existing) => *existing = tournament,
                None => config.tournaments.push(tournament),
            }
        }
        config.minimum_drives.extend(value.minimum_drives);
        config
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single tournament inside the configuration file.
struct RawTournament {
    #[serde(rename = "type")]
    tournament_type: TournamentType,
    name: String,
    #[serde(default)]
    default_mulligans: Option<u32>,
    /// Pars of holes 1 to 18 in order.
    #[serde(default)]
    pars: Option<Vec<i32>>,
}

impl From<RawTournament> for TournamentEntity {
    fn from(value: RawTournament) -> Self {
        let default = default_tournament(value.tournament_type);
        Self {
            tournament_type: value.tournament_type,
            name: value.name,
            default_mulligans: value
                .default_mulligans
                .unwrap_or(default.default_mulligans),
            course_pars: value
                .pars
                .map(|pars| pars_from_slice(&pars))
                .unwrap_or(default.course_pars),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn pars_from_slice(pars: &[i32]) -> CoursePars {
    (1u8..).zip(pars.iter().copied()).take(18).collect()
}

fn default_minimum_drives(tournament_type: TournamentType) -> u32 {
    match tournament_type {
        TournamentType::TwoMan => 5,
        TournamentType::FourMan => 3,
    }
}

/// Built-in tournament definition shipped with the binary.
fn default_tournament(tournament_type: TournamentType) -> TournamentEntity {
    let (name, default_mulligans) = match tournament_type {
        TournamentType::TwoMan => ("2-Man Scramble", 3),
        TournamentType::FourMan => ("4-Man Scramble", 2),
    };
    TournamentEntity {
        tournament_type,
        name: name.to_owned(),
        default_mulligans,
        course_pars: pars_from_slice(&DEFAULT_PARS),
    }
}
