use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use chrono::{FixedOffset, Offset, Utc};

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    /// Unset means the in-memory store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub media_dir: PathBuf,
    /// Three-letter prefix every roster identifier must carry.
    pub id_prefix: String,
    /// Offset used when timestamps are shown to people or written to exports.
    pub display_offset: FixedOffset,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            database_url: None,
            max_connections: 5,
            media_dir: PathBuf::from("media"),
            id_prefix: "SBU".to_string(),
            display_offset: Utc.fix(),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let offset_minutes: i32 = try_load("ATTENDANCE_UTC_OFFSET_MINUTES", "0")?;
        let display_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| anyhow!("ATTENDANCE_UTC_OFFSET_MINUTES out of range: {offset_minutes}"))?;

        let database_url = var("DATABASE_URL");
        if database_url.is_none() {
            log::warn!("DATABASE_URL not set, records will only live in memory");
        }

        Ok(Self {
            bind: try_load("ATTENDANCE_BIND", "127.0.0.1:3000")?,
            database_url,
            max_connections: try_load("ATTENDANCE_DB_MAX_CONNECTIONS", "5")?,
            media_dir: try_load("ATTENDANCE_MEDIA_DIR", "media")?,
            id_prefix: id_prefix(&try_load::<String>("ATTENDANCE_ID_PREFIX", "SBU")?)?,
            display_offset,
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        log::info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value `{raw}`"))
}

fn id_prefix(raw: &str) -> anyhow::Result<String> {
    let prefix = raw.trim().to_ascii_uppercase();
    if prefix.len() != 3 || !prefix.bytes().all(|b| b.is_ascii_alphabetic()) {
        bail!("ATTENDANCE_ID_PREFIX must be three letters, got `{raw}`");
    }
    Ok(prefix)
}
