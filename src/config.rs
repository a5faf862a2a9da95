//! Server configuration and validation.
//!
//! Configuration is built once, validated eagerly, and immutable afterwards.
//! The rest of the crate receives explicit `ServerConfig` values; only
//! [`ServerConfig::from_env`] touches process-wide environment variables, so
//! everything downstream is trivially testable with fixtures.

use thiserror::Error;

use crate::types::BoardId;

/// Environment variable names used by [`ServerConfig::from_env`].
const ENV_API_KEY: &str = "TRELLO_API_KEY";
const ENV_API_TOKEN: &str = "TRELLO_API_TOK";
const ENV_CLIENT_SECRET: &str = "TRELLO_CLIENT_SECRET";
const ENV_BOARD_ID: &str = "ATC_TRELLO_BOARD_ID";
const ENV_PORT: &str = "PORT";

/// Default listen port when `PORT` is unset.
const DEFAULT_PORT: u16 = 5000;

/// Errors raised while building a [`ServerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The port is not a number in [1, 65535].
    #[error("port [{0}] is invalid - must be a number between 1 and 65535")]
    InvalidPort(String),

    /// A required Trello credential is absent.
    #[error("missing Trello credential: {0}")]
    MissingCredential(&'static str),

    /// A required environment variable is absent.
    #[error("missing environment variable: {0}")]
    MissingEnv(&'static str),
}

/// Trello API credentials plus the shared webhook secret.
#[derive(Clone)]
pub struct Credentials {
    /// Trello API key, sent as a query parameter on every API call.
    pub api_key: String,

    /// Trello API token, sent alongside the key.
    pub api_token: String,

    /// Shared secret Trello signs webhook deliveries with.
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

/// Immutable configuration for the webhook server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    port: u16,
    credentials: Credentials,
    board_id: BoardId,
}

impl ServerConfig {
    /// Creates a validated configuration.
    ///
    /// Fails with [`ConfigError`] if the port is zero or either the API key
    /// or API token is empty. Performs no I/O.
    pub fn new(
        port: u16,
        credentials: Credentials,
        board_id: BoardId,
    ) -> Result<Self, ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port.to_string()));
        }
        if credentials.api_key.is_empty() {
            return Err(ConfigError::MissingCredential("API key"));
        }
        if credentials.api_token.is_empty() {
            return Err(ConfigError::MissingCredential("API token"));
        }

        Ok(ServerConfig {
            port,
            credentials,
            board_id,
        })
    }

    /// Loads configuration from the environment.
    ///
    /// Reads `TRELLO_API_KEY`, `TRELLO_API_TOK`, `TRELLO_CLIENT_SECRET`,
    /// `ATC_TRELLO_BOARD_ID`, and `PORT` (default 5000).
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var(ENV_PORT) {
            Ok(raw) => parse_port(&raw)?,
            Err(_) => DEFAULT_PORT,
        };

        let credentials = Credentials {
            api_key: require_env(ENV_API_KEY)?,
            api_token: require_env(ENV_API_TOKEN)?,
            client_secret: require_env(ENV_CLIENT_SECRET)?,
        };
        let board_id = BoardId::new(require_env(ENV_BOARD_ID)?);

        ServerConfig::new(port, credentials, board_id)
    }

    /// The port the listener binds on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The Trello credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The shared secret as bytes, for signature verification.
    pub fn client_secret(&self) -> &[u8] {
        self.credentials.client_secret.as_bytes()
    }

    /// The board whose change events the webhook subscribes to.
    pub fn board_id(&self) -> &BoardId {
        &self.board_id
    }
}

/// Parses a textual port into a valid listen port.
///
/// Rejects non-numeric input, zero, negatives, and anything above 65535.
pub fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidPort(raw.to_string())),
        Ok(port) => Ok(port),
    }
}

fn require_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnv(name)),
    }
}
