//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use ticket_core::Snowflake;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub api: ServerConfig,
    pub database: DatabaseConfig,
    pub platform: PlatformConfig,
    pub tickets: TicketTimings,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Chat platform credentials and endpoints
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// REST base URL, e.g. `https://discord.com/api/v10`
    pub api_url: String,
    pub bot_token: String,
    /// The bot's own user id; recorded as closer for auto-closes
    pub bot_user_id: Snowflake,
    /// Shared secret the interaction forwarder sends as a bearer token
    pub interaction_token: String,
}

/// Timing knobs for the ticket lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketTimings {
    /// How often an inactivity watcher polls
    pub poll_interval: Duration,
    /// Default inactivity threshold for newly configured guilds
    pub inactivity_hours: i32,
    /// Time between the inactivity warning and the auto-close
    pub grace_period: Duration,
    /// Delay between the closing notice and channel deletion
    pub delete_delay: Duration,
    /// How long feedback buttons stay valid after close
    pub feedback_window: Duration,
    /// Max age of a forwarded interaction or a pending selection
    pub interaction_timeout: Duration,
    /// Messages captured per transcript (1..=100)
    pub transcript_limit: u8,
}

impl Default for TicketTimings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60 * 60),
            inactivity_hours: 48,
            grace_period: Duration::from_secs(60 * 60),
            delete_delay: Duration::from_secs(10),
            feedback_window: Duration::from_secs(7 * 24 * 60 * 60),
            interaction_timeout: Duration::from_secs(60),
            transcript_limit: 100,
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "ticket-server".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_platform_url() -> String {
    "https://discord.com/api/v10".to_string()
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        let defaults = TicketTimings::default();

        Ok(Self {
            app: AppSettings {
                name: vars.get("APP_NAME").unwrap_or_else(default_app_name),
                env: vars
                    .get("APP_ENV")
                    .and_then(|s| Environment::parse(&s))
                    .unwrap_or_default(),
            },
            api: ServerConfig {
                host: vars.get("API_HOST").unwrap_or_else(default_host),
                port: vars.parse("API_PORT")?.unwrap_or_else(default_port),
            },
            database: DatabaseConfig {
                url: vars.require("DATABASE_URL")?,
                max_connections: vars
                    .parse("DATABASE_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_max_connections),
                min_connections: vars
                    .parse("DATABASE_MIN_CONNECTIONS")?
                    .unwrap_or_else(default_min_connections),
            },
            platform: PlatformConfig {
                api_url: vars
                    .get("PLATFORM_API_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(default_platform_url),
                bot_token: vars.require("PLATFORM_BOT_TOKEN")?,
                bot_user_id: vars
                    .parse("PLATFORM_BOT_USER_ID")?
                    .ok_or(ConfigError::MissingVar("PLATFORM_BOT_USER_ID"))?,
                interaction_token: vars.require("INTERACTION_TOKEN")?,
            },
            tickets: TicketTimings {
                poll_interval: vars
                    .seconds("TICKET_POLL_INTERVAL_SECS")?
                    .unwrap_or(defaults.poll_interval),
                inactivity_hours: vars
                    .parse("TICKET_INACTIVITY_HOURS")?
                    .unwrap_or(defaults.inactivity_hours),
                grace_period: vars
                    .seconds("TICKET_GRACE_PERIOD_SECS")?
                    .unwrap_or(defaults.grace_period),
                delete_delay: vars
                    .seconds("TICKET_DELETE_DELAY_SECS")?
                    .unwrap_or(defaults.delete_delay),
                feedback_window: vars
                    .seconds("TICKET_FEEDBACK_WINDOW_SECS")?
                    .unwrap_or(defaults.feedback_window),
                interaction_timeout: vars
                    .seconds("TICKET_INTERACTION_TIMEOUT_SECS")?
                    .unwrap_or(defaults.interaction_timeout),
                transcript_limit: vars
                    .parse::<u8>("TICKET_TRANSCRIPT_LIMIT")?
                    .map_or(defaults.transcript_limit, |n| n.clamp(1, 100)),
            },
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.trim().is_empty())
    }

    fn require(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::MissingVar(name))
    }

    fn parse<T: FromStr>(&self, name: &'static str) -> Result<Option<T>, ConfigError> {
        self.get(name)
            .map(|raw| {
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(name, raw.clone()))
            })
            .transpose()
    }

    fn seconds(&self, name: &'static str) -> Result<Option<Duration>, ConfigError> {
        Ok(self.parse::<u64>(name)?.map(Duration::from_secs))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
