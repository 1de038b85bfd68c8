//! Configuration and Environment Helpers
//!
//! The server has no configuration file. Its only settings are the name and
//! version reported in the startup banner and the `initialize` response,
//! both taken from environment variables with defaults. Log filtering is
//! handled separately through `RUST_LOG`.

/// Default server name reported to clients.
pub const DEFAULT_SERVER_NAME: &str = "math-mcp-server";

/// Server metadata loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Server name as reported in MCP initialize responses
    pub name: String,
    /// Server version string as reported in MCP initialize responses
    pub version: String,
}

impl ServerConfig {
    /// Load configuration from the environment.
    ///
    /// # Environment Variables
    /// - SERVER_NAME: Name of the server (default: "math-mcp-server")
    /// - SERVER_VERSION: Version string (default: the crate version)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Empty values fall back to the defaults, the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            name: get("SERVER_NAME", DEFAULT_SERVER_NAME),
            version: get("SERVER_VERSION", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_when_unset() {
        let config = ServerConfig::default();
        assert_eq!(config.name, DEFAULT_SERVER_NAME);
        assert_eq!(config.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn reads_overrides_and_ignores_blank_values() {
        let vars: HashMap<&str, &str> = [("SERVER_NAME", "calc"), ("SERVER_VERSION", "  ")]
            .into_iter()
            .collect();
        let config = ServerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.name, "calc");
        assert_eq!(config.version, env!("CARGO_PKG_VERSION"));
    }
}
