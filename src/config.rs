//! Layered settings: built-in defaults, then an optional TOML file, then
//! `BULLION_*` environment variables (`BULLION_BOARD__MARKET_URL=...`).
//! `PORT` wins over everything for the listen port.

use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::clock::ClockStyle;
use crate::refresh::DEFAULT_REFRESH_SECS;

pub const DEFAULT_CONFIG_FILE: &str = "bullion";
pub const DEFAULT_MARKET_URL: &str = "https://api.daralsabaek.com/api/goldAndFundBalance/getMetalPrices";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub log_filter: String,
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub board: BoardSettings,
    pub metrics: MetricsSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Directory holding the display page. Not served when unset.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    pub path: PathBuf,
    pub default_collection: String,
}

/// Prometheus exporter; only read with the `metrics-exporter` feature.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    pub listen: SocketAddr,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoardSettings {
    /// Where adjustments are read from. Defaults to this process's own
    /// passthrough endpoint.
    #[serde(default)]
    pub adjustments_url: Option<String>,
    pub market_url: String,
    pub refresh_secs: u32,
    pub request_timeout_secs: u64,
    pub currency: String,
    pub clock_style: ClockStyle,
}

impl Settings {
    /// Load settings. An explicit `path` must exist; otherwise `bullion.toml`
    /// in the working directory is read if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .set_default("log_filter", "info,tower_http=debug")?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.static_dir", "static")?
            .set_default("store.path", "data/bullion.sled")?
            .set_default("store.default_collection", "asd")?
            .set_default("board.market_url", DEFAULT_MARKET_URL)?
            .set_default("board.refresh_secs", i64::from(DEFAULT_REFRESH_SECS))?
            .set_default("board.request_timeout_secs", 10)?
            .set_default("board.currency", "KWD")?
            .set_default("board.clock_style", "arabic")?
            .set_default("metrics.listen", "0.0.0.0:9000")?
            .add_source(file)
            .add_source(
                Environment::with_prefix("BULLION")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.port", env::var("PORT").ok())?
            .build()?
            .try_deserialize()
    }

    /// Adjustment endpoint, falling back to the passthrough service listening
    /// on `local`.
    pub fn adjustments_url(&self, local: SocketAddr) -> String {
        self.board
            .adjustments_url
            .clone()
            .unwrap_or_else(|| format!("http://{}/api/mongodb-data", reachable_addr(local)))
    }
}

/// Address a client on this host can connect to for a listener bound at
/// `bound`. Wildcard binds map to the loopback of the same family.
pub fn reachable_addr(bound: SocketAddr) -> SocketAddr {
    match bound.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => SocketAddr::new(Ipv4Addr::LOCALHOST.into(), bound.port()),
        IpAddr::V6(ip) if ip.is_unspecified() => SocketAddr::new(Ipv6Addr::LOCALHOST.into(), bound.port()),
        _ => bound,
    }
}
