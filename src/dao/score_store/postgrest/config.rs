use super::error::{PostgrestDaoError, PostgrestResult};

/// Runtime configuration describing how to reach the hosted PostgREST API.
#[derive(Debug, Clone)]
pub struct PostgrestConfig {
    /// Project URL, without the `/rest/v1` suffix.
    pub base_url: String,
    /// Key sent both as `apikey` and as bearer token.
    pub api_key: String,
    /// Optional schema selected through the `Accept-Profile`/`Content-Profile` headers.
    pub schema: Option<String>,
}

impl PostgrestConfig {
    /// Construct a configuration from an explicit project URL and API key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            schema: None,
        }
    }

    /// Target a schema other than the default `public` one.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Build a configuration by reading the expected environment variables.
    pub fn from_env() -> PostgrestResult<Self> {
        let base_url = std::env::var("SUPABASE_URL").map_err(|_| {
            PostgrestDaoError::MissingEnvVar {
                var: "SUPABASE_URL",
            }
        })?;
        let api_key = std::env::var("SUPABASE_ANON_KEY").map_err(|_| {
            PostgrestDaoError::MissingEnvVar {
                var: "SUPABASE_ANON_KEY",
            }
        })?;

        let mut config = Self::new(base_url, api_key);
        if let Some(schema) = std::env::var("SUPABASE_SCHEMA")
            .ok()
            .filter(|value| !value.is_empty())
        {
            config = config.with_schema(schema);
        }

        Ok(config)
    }
}
