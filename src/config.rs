use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::RosterError;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "ROSTER_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub max_connections: u32,
    pub loglevel: String,
    /// Master key for the session cookie; needs at least 64 bytes.
    pub cookie_secret: String,
    /// Drop the `Secure` cookie flag, for plain-http local setups.
    pub insecure_cookie: bool,
    pub login_per_minute: u32,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            database_url: "sqlite:roster.db".to_string(),
            max_connections: 5,
            loglevel: "info".to_string(),
            cookie_secret: String::new(),
            insecure_cookie: false,
            login_per_minute: 10,
        }
    }
}

/// Account created on startup when the database has no admin yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub admin_username: String,
    pub admin_password: Option<String>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_username: "admin".to_string(),
            admin_password: None,
        }
    }
}

impl Config {
    /// Defaults, then the TOML file (if any), then `ROSTER_*` env vars.
    /// Nested keys use `__`, e.g. `ROSTER_BASIC__LISTEN_ADDR`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RosterError> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| RosterError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_without_a_file() {
        let cfg = Config::load("does-not-exist.toml").expect("defaults should extract");
        assert_eq!(cfg.bootstrap.admin_username, "admin");
        assert!(cfg.basic.max_connections > 0);
        assert!(cfg.basic.login_per_minute > 0);
    }
}
