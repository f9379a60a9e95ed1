//! Process configuration, read from environment variables.
//!
//! | Variable                   | Default        | Meaning                          |
//! |----------------------------|----------------|----------------------------------|
//! | `LEDGER_STORE`             | `memory`       | `memory` or `postgres`           |
//! | `DATABASE_URL`             | (none)         | required when store = `postgres` |
//! | `DATABASE_MAX_CONNECTIONS` | `10`           | Postgres pool size               |
//! | `BIND_ADDR`                | `0.0.0.0:8080` | HTTP listen address              |

use std::net::SocketAddr;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be set when LEDGER_STORE=postgres")]
    Missing { var: &'static str },

    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which ledger store backs the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreBackend,
}

impl LedgerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_raw = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::Invalid {
                var: "BIND_ADDR",
                value: bind_raw.clone(),
                reason: e.to_string(),
            }
        })?;

        let store = match lookup("LEDGER_STORE").as_deref().map(str::trim) {
            None | Some("") => StoreBackend::Memory,
            Some(kind) if kind.eq_ignore_ascii_case("memory") => StoreBackend::Memory,
            Some(kind) if kind.eq_ignore_ascii_case("postgres") => {
                let database_url = lookup("DATABASE_URL")
                    .filter(|url| !url.trim().is_empty())
                    .ok_or(ConfigError::Missing { var: "DATABASE_URL" })?;
                let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
                    None => DEFAULT_MAX_CONNECTIONS,
                    Some(raw) => parse_pool_size(&raw)?,
                };
                StoreBackend::Postgres {
                    database_url,
                    max_connections,
                }
            }
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LEDGER_STORE",
                    value: other.to_string(),
                    reason: "expected memory or postgres".to_string(),
                });
            }
        };

        Ok(Self { bind_addr, store })
    }
}

fn parse_pool_size(raw: &str) -> Result<u32, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var: "DATABASE_MAX_CONNECTIONS",
        value: raw.to_string(),
        reason,
    };
    let n: u32 = raw.trim().parse().map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?;
    if n == 0 {
        return Err(invalid("must be at least 1".to_string()));
    }
    Ok(n)
}
