use std::path::PathBuf;
use std::str::FromStr;

/// Public URL prefix under which generated images are served.
pub const PROCESSED_BASE_URL: &str = "/processed";

/// Startup configuration errors. Reported instead of panicking so `main`
/// can log them and exit non-zero.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`). Also bounds the
    /// outbound generative-AI call.
    pub request_timeout_secs: u64,
    pub database_url: String,
    pub storage: StorageConfig,
    pub gemini: GeminiConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory uploaded assets are written to.
    pub assets_dir: PathBuf,
    /// URL prefix assets are served under. A relative path (`/assets`) is
    /// mounted by this server; an absolute URL is assumed to be a CDN.
    pub assets_base_url: String,
    /// Directory generated images are written to, served at
    /// [`PROCESSED_BASE_URL`].
    pub processed_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    /// Used when a template version names no model.
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Firebase project whose ID tokens are accepted. `None` disables
    /// Firebase verification.
    pub firebase_project_id: Option<String>,
    /// Lower-cased emails that are always treated as admins.
    pub admin_emails: Vec<String>,
    /// Custom claim that marks an admin when set to `true`.
    pub admin_claim_key: String,
    /// Present only when `DEV_AUTH_ENABLED=1`.
    pub dev: Option<DevAuthConfig>,
}

/// Development-only email/password login.
#[derive(Debug, Clone)]
pub struct DevAuthConfig {
    pub admin_email: String,
    pub admin_password: String,
    /// HS256 secret for dev tokens. Random per process when unset.
    pub secret: String,
    pub token_ttl_mins: i64,
}

const DEFAULT_DEV_TOKEN_TTL_MINS: i64 = 12 * 60;

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `8080`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `DATABASE_URL`         | composed from `DB_*`       |
    /// | `DB_HOST`              | `localhost`                |
    /// | `DB_PORT`              | `5432`                     |
    /// | `DB_USER`              | `imageai`                  |
    /// | `DB_PASSWORD`          | `imageai_pass`             |
    /// | `DB_NAME`              | `imageai_db`               |
    /// | `DB_SSLMODE`           | `disable`                  |
    /// | `ASSETS_DIR`           | `./assets`                 |
    /// | `ASSETS_BASE_URL`      | `/assets`                  |
    /// | `PROCESSED_DIR`        | `./processed`              |
    /// | `GEMINI_API_KEY`       | empty                      |
    /// | `GEMINI_BASE_URL`      | Google API host            |
    /// | `GEMINI_MODEL`         | `gemini-1.5-pro`           |
    /// | `FIREBASE_PROJECT_ID`  | unset                      |
    /// | `ADMIN_EMAILS`         | empty                      |
    /// | `ADMIN_CLAIM_KEY`      | `admin`                    |
    /// | `DEV_AUTH_ENABLED`     | unset (`1` enables)        |
    /// | `DEV_ADMIN_EMAIL`      | required with dev auth     |
    /// | `DEV_ADMIN_PASSWORD`   | required with dev auth     |
    /// | `DEV_AUTH_SECRET`      | random per process         |
    /// | `DEV_TOKEN_TTL_MINS`   | `720`                      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary lookup. Blank values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let cors_origins = split_csv(&env.string("CORS_ORIGINS", "http://localhost:5173"));

        let storage = StorageConfig {
            assets_dir: env.string("ASSETS_DIR", "./assets").into(),
            assets_base_url: env.string("ASSETS_BASE_URL", "/assets"),
            processed_dir: env.string("PROCESSED_DIR", "./processed").into(),
        };

        let gemini = GeminiConfig {
            api_key: env.string("GEMINI_API_KEY", ""),
            base_url: env.string("GEMINI_BASE_URL", imageai_genai::DEFAULT_BASE_URL),
            model: env.string("GEMINI_MODEL", imageai_genai::DEFAULT_MODEL),
        };

        let dev = if env.get("DEV_AUTH_ENABLED").as_deref() == Some("1") {
            Some(DevAuthConfig {
                admin_email: env.get("DEV_ADMIN_EMAIL").ok_or(ConfigError::Missing("DEV_ADMIN_EMAIL"))?,
                admin_password: env
                    .get("DEV_ADMIN_PASSWORD")
                    .ok_or(ConfigError::Missing("DEV_ADMIN_PASSWORD"))?,
                secret: env
                    .get("DEV_AUTH_SECRET")
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                token_ttl_mins: env.parse("DEV_TOKEN_TTL_MINS", DEFAULT_DEV_TOKEN_TTL_MINS)?,
            })
        } else {
            None
        };

        let auth = AuthConfig {
            firebase_project_id: env.get("FIREBASE_PROJECT_ID"),
            admin_emails: split_csv(&env.string("ADMIN_EMAILS", ""))
                .into_iter()
                .map(|e| e.to_lowercase())
                .collect(),
            admin_claim_key: env.string("ADMIN_CLAIM_KEY", "admin"),
            dev,
        };

        Ok(Self {
            host: env.string("HOST", "0.0.0.0"),
            port: env.parse("PORT", 8080)?,
            cors_origins,
            request_timeout_secs: env.parse("REQUEST_TIMEOUT_SECS", 30)?,
            database_url: database_url(&env)?,
            storage,
            gemini,
            auth,
        })
    }
}

/// `DATABASE_URL` wins; otherwise the DSN is composed from the `DB_*` parts.
fn database_url<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Result<String, ConfigError> {
    if let Some(url) = env.get("DATABASE_URL") {
        return Ok(url);
    }
    let port: u16 = env.parse("DB_PORT", 5432)?;
    Ok(format!(
        "postgres://{}:{}@{}:{port}/{}?sslmode={}",
        env.string("DB_USER", "imageai"),
        env.string("DB_PASSWORD", "imageai_pass"),
        env.string("DB_HOST", "localhost"),
        env.string("DB_NAME", "imageai_db"),
        env.string("DB_SSLMODE", "disable"),
    ))
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var: key,
                reason: e.to_string(),
                value,
            }),
        }
    }
}
