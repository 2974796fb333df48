use std::env;
use std::time::Duration;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const PORT: &str = "PORT";
    pub const DATABASE_URL: &str = "DATABASE_URL";
    /// Symmetric secret for signing access tokens. Required, non-empty;
    /// the process refuses to start without it.
    pub const JWT_SECRET: &str = "JWT_SECRET";
    pub const ACCESS_TOKEN_TTL_SECS: &str = "ACCESS_TOKEN_TTL_SECS";
    /// Per-statement storage deadline, distinct from any request timeout.
    pub const QUERY_TIMEOUT_MS: &str = "QUERY_TIMEOUT_MS";
}

/// Default values
pub mod defaults {
    pub const PORT: u16 = 8080;
    pub const DATABASE_URL: &str = "./.db/memo.db";
    pub const ACCESS_TOKEN_TTL_SECS: u64 = 3600;
    pub const QUERY_TIMEOUT_MS: u64 = 2000;
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub query_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let ttl_secs: u64 = env::var(env_vars::ACCESS_TOKEN_TTL_SECS)
            .unwrap_or_else(|_| defaults::ACCESS_TOKEN_TTL_SECS.to_string())
            .parse()
            .expect("ACCESS_TOKEN_TTL_SECS must be a valid number of seconds");

        let query_timeout_ms: u64 = env::var(env_vars::QUERY_TIMEOUT_MS)
            .unwrap_or_else(|_| defaults::QUERY_TIMEOUT_MS.to_string())
            .parse()
            .expect("QUERY_TIMEOUT_MS must be a valid number of milliseconds");

        Self {
            port: env::var(env_vars::PORT)
                .unwrap_or_else(|_| defaults::PORT.to_string())
                .parse()
                .expect("PORT must be a valid number"),
            database_url: env::var(env_vars::DATABASE_URL)
                .unwrap_or_else(|_| defaults::DATABASE_URL.to_string()),
            jwt_secret: env::var(env_vars::JWT_SECRET).unwrap_or_default(),
            access_token_ttl: Duration::from_secs(ttl_secs),
            query_timeout: Duration::from_millis(query_timeout_ms),
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            database_url: String::new(),
            jwt_secret: "test-secret".to_string(),
            access_token_ttl: Duration::from_secs(3600),
            query_timeout: Duration::from_secs(2),
        }
    }
}
