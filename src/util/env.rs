use std::time::Duration;

use thiserror::Error;

const DEFAULT_CLAIM_TIMEOUT_SECS: u64 = 30;

/// Process configuration, read once at startup and passed down explicitly.
///
/// The engine-related variables are optional on purpose: the server can run
/// (and serve submissions, rejections and reads) without an engine deployment,
/// but any approval will fail with a typed `Unconfigured` error until the
/// operator provides them.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_api_port: u16,
    pub admin_token: String,
    pub cors_allow_origins: String,

    pub engine_url: Option<String>,
    pub engine_secret_key: Option<String>,
    pub backend_wallet: Option<String>,
    pub token_contract_address: Option<String>,
    pub chain_id: Option<String>,
    pub claim_timeout: Duration,
}

impl Config {
    pub fn from_env() -> EnvResult<Self> {
        // load `.env` if present; a missing file is fine in deployment
        _ = dotenvy::dotenv();

        let server_api_port = required("SERVER_API_PORT")?
            .parse::<u16>()
            .map_err(|e| EnvErr::Invalid {
                name: "SERVER_API_PORT",
                reason: e.to_string(),
            })?;

        let claim_timeout_secs = match optional("CLAIM_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| EnvErr::Invalid {
                name: "CLAIM_TIMEOUT_SECS",
                reason: e.to_string(),
            })?,
            None => DEFAULT_CLAIM_TIMEOUT_SECS,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            server_api_port,
            admin_token: required("ADMIN_TOKEN")?,
            cors_allow_origins: optional("CORS_ALLOW_ORIGINS").unwrap_or_else(|| "*".to_string()),

            engine_url: optional("ENGINE_URL"),
            engine_secret_key: optional("ENGINE_SECRET_KEY"),
            backend_wallet: optional("BACKEND_WALLET"),
            token_contract_address: optional("TOKEN_CONTRACT_ADDRESS"),
            chain_id: optional("CHAIN_ID"),
            claim_timeout: Duration::from_secs(claim_timeout_secs),
        })
    }
}

fn required(name: &'static str) -> EnvResult<String> {
    optional(name).ok_or(EnvErr::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    match dotenvy::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

pub type EnvResult<T> = core::result::Result<T, EnvErr>;

#[derive(Debug, Error)]
pub enum EnvErr {
    #[error("missing required environment variable '{0}'")]
    Missing(&'static str),

    #[error("invalid value for '{name}': {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_optional_treats_blank_as_unset() {
        // SAFETY: test process, no concurrent env mutation
        unsafe { std::env::set_var("SWAGLY_TEST_BLANK_VAR", "   ") };
        assert_eq!(optional("SWAGLY_TEST_BLANK_VAR"), None);

        unsafe { std::env::set_var("SWAGLY_TEST_SET_VAR", "value") };
        assert_eq!(optional("SWAGLY_TEST_SET_VAR"), Some("value".to_string()));
    }
}
