//! Server configuration.
//!
//! Plain serde struct, so applications can embed it in whatever config file
//! they already load. [`ServerConfig::from_env`] covers the container case:
//!
//! | Variable | Default | |
//! |---|---|---|
//! | `KEYWAY_ADDR` | `0.0.0.0:3000` | listen address |
//! | `KEYWAY_BASE_ROUTE` | *(empty)* | prefix for every bound path |

use std::net::{Ipv4Addr, SocketAddr};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::reify::ReifyConfig;

pub const ADDR_VAR: &str = "KEYWAY_ADDR";
pub const BASE_ROUTE_VAR: &str = "KEYWAY_BASE_ROUTE";

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub base_route: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 3000)),
            base_route: String::new(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `KEYWAY_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(addr) = lookup(ADDR_VAR) {
            config.addr = addr
                .parse()
                .map_err(|e| Error::config(format!("{ADDR_VAR}=`{addr}`: {e}")))?;
        }
        if let Some(base_route) = lookup(BASE_ROUTE_VAR) {
            config.base_route = base_route;
        }
        Ok(config)
    }

    /// The [`ReifyConfig`] matching this server. Attach an `extend_context`
    /// hook to it as needed.
    pub fn reify_config(&self) -> ReifyConfig {
        ReifyConfig::new(self.base_route.clone())
    }
}
