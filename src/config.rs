use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub allowed_origin: String,
    pub max_frame_bytes: usize,
    pub hub: HubConfig,
}

/// The parts of configuration the core cares about.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub default_rooms: Vec<String>,
    /// Ledger capacity before the oldest messages stop being tracked.
    pub max_messages: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            default_rooms: ["General", "Tech", "Random"].map(String::from).to_vec(),
            max_messages: 10_000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            allowed_origin: "http://localhost:3000".to_owned(),
            max_frame_bytes: 100_000_000,
            hub: HubConfig::default(),
        }
    }
}

impl Config {
    /// Reads `RELAY_*` variables, with `.env` taken into account.
    pub fn from_env() -> anyhow::Result<Config> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
        let mut config = Config::default();

        if let Some(addr) = parsed(&lookup, "RELAY_BIND_ADDR")? {
            config.bind_addr = addr;
        }
        if let Some(origin) = lookup("RELAY_ALLOWED_ORIGIN") {
            config.allowed_origin = origin;
        }
        if let Some(bytes) = parsed(&lookup, "RELAY_MAX_FRAME_BYTES")? {
            config.max_frame_bytes = bytes;
        }
        if let Some(max) = parsed(&lookup, "RELAY_MAX_MESSAGES")? {
            config.hub.max_messages = max;
        }
        if let Some(rooms) = lookup("RELAY_DEFAULT_ROOMS") {
            config.hub.default_rooms = rooms
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(config)
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| raw.parse::<T>().with_context(|| format!("{key}={raw:?}")))
        .transpose()
}
