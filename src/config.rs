//! Server configuration parsed from environment variables.
//!
//! Optional:
//! - `PORT`: listen port, default 3000
//! - `BIND_ADDR`: listen address, default `0.0.0.0`
//! - `STATIC_DIR`: client bundle directory, default `public`
//!
//! Unset or blank variables take their default. A value that is present but
//! does not parse is a start-up error rather than a silent fallback.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_STATIC_DIR: &str = "public";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: DEFAULT_BIND_ADDR, port: DEFAULT_PORT, static_dir: PathBuf::from(DEFAULT_STATIC_DIR) }
    }
}

impl ServerConfig {
    /// Build typed server config from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `PORT` or `BIND_ADDR` is set but
    /// malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = env_parse(&lookup, "PORT", DEFAULT_PORT)?;
        let bind_addr = env_parse(&lookup, "BIND_ADDR", DEFAULT_BIND_ADDR)?;
        let static_dir = non_blank(&lookup, "STATIC_DIR").map_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR), PathBuf::from);
        Ok(Self { bind_addr, port, static_dir })
    }

    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn non_blank(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match non_blank(lookup, key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { var: key, value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
