use std::time::Duration;

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::{debug, info};

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DATABASE: &str = "scramble_board";
const DEFAULT_ATTEMPTS: u32 = 10;
const FIRST_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Connection settings for the MongoDB score store.
#[derive(Clone)]
pub struct MongoConfig {
    options: ClientOptions,
    database_name: String,
    connect_attempts: u32,
}

impl MongoConfig {
    /// Read `MONGO_URI`, plus the optional `MONGO_DB` and `MONGO_CONNECT_ATTEMPTS`.
    pub async fn from_env() -> MongoResult<Self> {
        let uri = std::env::var("MONGO_URI")
            .map_err(|_| MongoDaoError::MissingEnvVar { var: "MONGO_URI" })?;
        let mut config = Self::from_uri(&uri).await?;

        if let Ok(name) = std::env::var("MONGO_DB") {
            if !name.trim().is_empty() {
                config.database_name = name.trim().to_owned();
            }
        }
        if let Some(attempts) = std::env::var("MONGO_CONNECT_ATTEMPTS")
            .ok()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|attempts| *attempts > 0)
        {
            config.connect_attempts = attempts;
        }
        Ok(config)
    }

    /// Parse a connection string, using the default database name.
    pub async fn from_uri(uri: &str) -> MongoResult<Self> {
        let mut options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;
        options
            .app_name
            .get_or_insert_with(|| env!("CARGO_PKG_NAME").to_owned());

        Ok(Self {
            options,
            database_name: DEFAULT_DATABASE.to_owned(),
            connect_attempts: DEFAULT_ATTEMPTS,
        })
    }

    /// Open a client and ping the database until it answers, backing off between attempts.
    pub(super) async fn open(&self) -> MongoResult<(Client, Database)> {
        let client = Client::with_options(self.options.clone())
            .map_err(|source| MongoDaoError::ClientConstruction { source })?;
        let database = client.database(&self.database_name);

        let mut backoff = FIRST_BACKOFF;
        for attempt in 1..=self.connect_attempts {
            match database.run_command(doc! { "ping": 1 }).await {
                Ok(_) => {
                    info!(database = %self.database_name, attempt, "connected to MongoDB");
                    return Ok((client, database));
                }
                Err(source) if attempt == self.connect_attempts => {
                    return Err(MongoDaoError::InitialPing {
                        attempts: attempt,
                        source,
                    });
                }
                Err(err) => {
                    debug!(attempt, error = %err, "MongoDB not reachable yet");
                    sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }

        Err(MongoDaoError::NoConnectAttempts)
    }
}
