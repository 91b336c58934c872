use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Duration;

const DEFAULT_ORIGINS: &str = "http://127.0.0.1:5500";

/// Runtime settings, read from `PARLEY_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub allowed_origins: Vec<String>,
    pub cookie_secure: bool,
    pub session_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("PARLEY_HOST").unwrap_or_else(|| "0.0.0.0".into());

        // PORT is what most hosting platforms inject
        let port: u16 = lookup("PARLEY_PORT")
            .or_else(|| lookup("PORT"))
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("invalid PARLEY_PORT")?;

        let db_path: PathBuf = lookup("PARLEY_DB_PATH")
            .unwrap_or_else(|| "parley.db".into())
            .into();

        let allowed_origins: Vec<String> = lookup("PARLEY_ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ORIGINS.into())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();
        if allowed_origins.is_empty() {
            bail!("PARLEY_ALLOWED_ORIGINS must name at least one origin");
        }

        let cookie_secure = match lookup("PARLEY_COOKIE_SECURE") {
            Some(value) => parse_bool(&value).context("invalid PARLEY_COOKIE_SECURE")?,
            None => true,
        };

        let ttl_hours: i64 = lookup("PARLEY_SESSION_TTL_HOURS")
            .unwrap_or_else(|| "744".into()) // 31 days; the cookie itself has no Max-Age
            .parse()
            .context("invalid PARLEY_SESSION_TTL_HOURS")?;
        let session_ttl = Duration::try_hours(ttl_hours)
            .filter(|ttl| *ttl > Duration::zero())
            .context("PARLEY_SESSION_TTL_HOURS out of range")?;

        Ok(Self {
            host,
            port,
            db_path,
            allowed_origins,
            cookie_secure,
            session_ttl,
        })
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got '{}'", other),
    }
}
