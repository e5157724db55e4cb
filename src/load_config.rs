/// `load_config` module: builds the runtime [`Settings`] from the environment (and `.env`).
///
/// There is no config file: the model's own `manifest.yaml` is the only file read, and that
/// happens in the core crate.
///
/// # Variables
/// - `HYPHA_SERVER_URL`: server base URL, default [`DEFAULT_SERVER_URL`]
/// - `HYPHA_API_TOKEN`: bearer token, required
/// - `HYPHA_WORKSPACE`: workspace owning the artifacts, default [`DEFAULT_WORKSPACE`]
/// - `HYPHA_COLLECTION`: parent collection alias, default [`DEFAULT_COLLECTION`]
///
/// # Errors
/// Errors are `anyhow::Error` naming the offending variable; they surface at the CLI boundary.
use anyhow::Result;
use std::env;
use tracing::{error, info};

pub const DEFAULT_SERVER_URL: &str = "https://hypha.aicell.io";
pub const DEFAULT_WORKSPACE: &str = "ri-scale";
pub const DEFAULT_COLLECTION: &str = "ai-model-hub";

pub const SERVER_URL_VAR: &str = "HYPHA_SERVER_URL";
pub const TOKEN_VAR: &str = "HYPHA_API_TOKEN";
pub const WORKSPACE_VAR: &str = "HYPHA_WORKSPACE";
pub const COLLECTION_VAR: &str = "HYPHA_COLLECTION";

#[derive(Clone)]
pub struct Settings {
    pub server_url: String,
    pub token: String,
    pub workspace: String,
    pub collection: String,
}

// Hand-written so the token never ends up in a log line.
impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("server_url", &self.server_url)
            .field("token", &"<redacted>")
            .field("workspace", &self.workspace)
            .field("collection", &self.collection)
            .finish()
    }
}

impl Settings {
    /// Reads settings from the process environment, without touching `.env`.
    pub fn from_env() -> Result<Self> {
        let server_url = var_or_default(SERVER_URL_VAR, DEFAULT_SERVER_URL)
            .trim_end_matches('/')
            .to_string();

        let token = match env::var(TOKEN_VAR) {
            Ok(token) if !token.trim().is_empty() => token,
            Ok(_) => {
                error!(var = TOKEN_VAR, "API token is empty");
                anyhow::bail!("{TOKEN_VAR} is set but empty; an API token is required");
            }
            Err(e) => {
                error!(error = ?e, var = TOKEN_VAR, "API token missing in environment");
                anyhow::bail!("{TOKEN_VAR} environment variable not set: {e}");
            }
        };

        let settings = Settings {
            server_url,
            token,
            workspace: var_or_default(WORKSPACE_VAR, DEFAULT_WORKSPACE),
            collection: var_or_default(COLLECTION_VAR, DEFAULT_COLLECTION),
        };
        info!(
            server_url = %settings.server_url,
            workspace = %settings.workspace,
            collection = %settings.collection,
            token_set = true,
            "Settings loaded from environment"
        );
        Ok(settings)
    }
}

/// Loads `.env` (if present) into the environment, then reads [`Settings`].
pub fn load_config() -> Result<Settings> {
    match dotenvy::dotenv() {
        Ok(path) => info!(env_file = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => info!("No .env file found, using process environment"),
        Err(e) => {
            error!(error = ?e, "Failed to load .env file");
            return Err(anyhow::anyhow!("Failed to load .env file: {e}"));
        }
    }
    Settings::from_env()
}

fn var_or_default(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}
