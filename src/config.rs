use std::{env, fmt::Display, str::FromStr};

use anyhow::{anyhow, bail, Context};
use log::{info, warn};

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub production: bool,
    pub jwt_secret: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub hash_rounds: u32,
    pub frontend_url: String,
    pub api_url: String,
    pub uploads_dir: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. `load` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let production = var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let port: u16 = try_load(&var, "PORT", "3001")?;

        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None if production => bail!("JWT_SECRET must be set when APP_ENV=production"),
            None => {
                warn!("JWT_SECRET not set, using insecure development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let database_url = var("DATABASE_URL");
        if database_url.is_none() {
            if production {
                bail!("DATABASE_URL must be set when APP_ENV=production");
            }
            warn!("DATABASE_URL not set, records are kept in memory (demo mode)");
        }

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            production,
            jwt_secret,
            database_url,
            db_max_connections: try_load(&var, "DB_MAX_CONNECTIONS", "5")?,
            hash_rounds: try_load(&var, "PBKDF2_ROUNDS", "600000")?,
            frontend_url: var("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            api_url: var("API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
            uploads_dir: var("UPLOADS_DIR").unwrap_or_else(|| "uploads".to_string()),
        })
    }

    /// Local configuration for tests and tools.
    pub fn development() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            production: false,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            database_url: None,
            db_max_connections: 5,
            hash_rounds: 1_000,
            frontend_url: "http://localhost:5173".to_string(),
            api_url: "http://localhost:3001".to_string(),
            uploads_dir: "uploads".to_string(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn try_load<T, F>(var: &F, key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_outside_production() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.hash_rounds, 600_000);
        assert!(!config.production);
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert!(config.database_url.is_none());
        assert_eq!(config.api_url, "http://localhost:3001");
        assert_eq!(config.bind_address(), "127.0.0.1:3001");
    }

    #[test]
    fn production_requires_a_secret() {
        let err = Config::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://localhost/boarding"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));

        let blank = Config::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("JWT_SECRET", "   "),
            ("DATABASE_URL", "postgres://localhost/boarding"),
        ]));
        assert!(blank.is_err());
    }

    #[test]
    fn production_requires_a_database() {
        let err = Config::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn production_with_everything_set() {
        let config = Config::from_lookup(lookup(&[
            ("APP_ENV", "Production"),
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_URL", "postgres://localhost/boarding"),
            ("PORT", "8080"),
            ("API_URL", "https://api.boarding.example/"),
        ]))
        .unwrap();
        assert!(config.production);
        assert_eq!(config.port, 8080);
        assert_eq!(config.api_url, "https://api.boarding.example");
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid PORT"));
    }
}
