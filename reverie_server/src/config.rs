use std::{env, io::Write, time::Duration};

use log::*;
use rand::RngCore;
use reverie_common::Secret;
use reverie_engine::{market_api::DEFAULT_STORE_TIMEOUT, EngineConfig, PseudonymScheme};
use serde_json::json;
use tempfile::NamedTempFile;

use crate::errors::ServerError;

const DEFAULT_REVERIE_HOST: &str = "127.0.0.1";
const DEFAULT_REVERIE_PORT: u16 = 8470;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/reverie.db";
const DEFAULT_JWT_ISSUER: &str = "reverie";
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 64;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    pub crypto: CryptoConfig,
    /// Upper bound on each storage call made while serving a request.
    pub store_timeout: Duration,
    /// Capacity of the event channels. Events published while a channel is full are dropped.
    pub event_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_REVERIE_HOST.to_string(),
            port: DEFAULT_REVERIE_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            auth: AuthConfig::default(),
            crypto: CryptoConfig::default(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("REVERIE_HOST").ok().unwrap_or_else(|| DEFAULT_REVERIE_HOST.into());
        let port = env::var("REVERIE_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for REVERIE_PORT. {e} Using the default, {DEFAULT_REVERIE_PORT}, \
                         instead."
                    );
                    DEFAULT_REVERIE_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_REVERIE_PORT);
        let database_url = env::var("REVERIE_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ REVERIE_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let crypto = CryptoConfig::try_from_env().unwrap_or_else(|e| {
            warn!("🪛️ Could not load the vendor key configuration from environment variables. {e}.");
            CryptoConfig::default()
        });
        let store_timeout = env::var("REVERIE_STORE_TIMEOUT_MS")
            .map_err(|_| {
                info!("🪛️ REVERIE_STORE_TIMEOUT_MS is not set. Using the default of {DEFAULT_STORE_TIMEOUT:?}.")
            })
            .and_then(|s| {
                s.parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|e| warn!("🪛️ Invalid configuration value for REVERIE_STORE_TIMEOUT_MS. {e}"))
            })
            .ok()
            .unwrap_or(DEFAULT_STORE_TIMEOUT);
        let event_buffer_size = env::var("REVERIE_EVENT_BUFFER_SIZE")
            .ok()
            .and_then(|s| {
                s.parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .or_else(|| {
                        warn!("🪛️ Invalid configuration value for REVERIE_EVENT_BUFFER_SIZE: {s}");
                        None
                    })
            })
            .unwrap_or(DEFAULT_EVENT_BUFFER_SIZE);
        Self { host, port, database_url, auth, crypto, store_timeout, event_buffer_size }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default().with_store_timeout(self.store_timeout)
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 secret that access tokens are signed with.
    pub jwt_secret: Secret<String>,
    /// Tokens from any other issuer are rejected.
    pub jwt_issuer: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate on \
             production like this since no previously issued token will be accepted. 🚨️🚨️🚨️"
        );
        let secret = random_hex(32);
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        match &mut tmpfile {
            Some((f, p)) => {
                let data = json!({ "jwt_secret": secret, "jwt_issuer": DEFAULT_JWT_ISSUER }).to_string();
                match writeln!(f, "{data}") {
                    Ok(()) => warn!(
                        "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production instance, \
                         you are doing it wrong! Set the REVERIE_JWT_SECRET environment variable instead. 🚨️🚨️🚨️",
                        p.to_str().unwrap_or("???")
                    ),
                    Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
                }
            },
            None => warn!("🪛️ Could not create a temporary file to store the JWT secret."),
        }
        Self { jwt_secret: Secret::new(secret), jwt_issuer: DEFAULT_JWT_ISSUER.to_string() }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret = env::var("REVERIE_JWT_SECRET")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [REVERIE_JWT_SECRET]")))?;
        if secret.trim().is_empty() {
            return Err(ServerError::ConfigurationError("REVERIE_JWT_SECRET is empty".into()));
        }
        let jwt_issuer = env::var("REVERIE_JWT_ISSUER").ok().unwrap_or_else(|| {
            info!("🪛️ REVERIE_JWT_ISSUER is not set. Using {DEFAULT_JWT_ISSUER}.");
            DEFAULT_JWT_ISSUER.to_string()
        });
        Ok(Self { jwt_secret: Secret::new(secret), jwt_issuer })
    }
}

//-------------------------------------------------  CryptoConfig  -----------------------------------------------------
/// The key and nonce behind the vendor pseudonyms. Changing either orphans every offer already on file.
#[derive(Clone, Debug)]
pub struct CryptoConfig {
    pub key: Secret<String>,
    pub nonce: Secret<String>,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ REVERIE_CRYPTO_KEY and REVERIE_CRYPTO_NONCE are not set. I'm using random values for this session. \
             Offers made in this session cannot be traced to their vendors after a restart. Run the server with \
             --generate-crypto-vars to create a permanent pair. 🚨️🚨️🚨️"
        );
        let (key, nonce) = PseudonymScheme::generate_config();
        Self { key: Secret::new(key), nonce: Secret::new(nonce) }
    }
}

impl CryptoConfig {
    pub fn try_from_env() -> Result<Self, ServerError> {
        let key = env::var("REVERIE_CRYPTO_KEY")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [REVERIE_CRYPTO_KEY]")))?;
        let nonce = env::var("REVERIE_CRYPTO_NONCE")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [REVERIE_CRYPTO_NONCE]")))?;
        let config = Self { key: Secret::new(key), nonce: Secret::new(nonce) };
        config.pseudonym_scheme()?;
        Ok(config)
    }

    pub fn pseudonym_scheme(&self) -> Result<PseudonymScheme, ServerError> {
        PseudonymScheme::from_hex(self.key.reveal(), self.nonce.reveal())
            .map_err(|e| ServerError::ConfigurationError(e.to_string()))
    }
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
