// Configuration loader with environment variable substitution

use super::types::*;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
        let content = std::fs::read_to_string(path.as_ref())
            .context("Failed to read config file")?;

        Self::parse(&content)
    }

    /// Parse configuration from a YAML string
    pub fn parse(content: &str) -> Result<AppConfig> {
        let content = Self::substitute_env_vars(content);

        let config: AppConfig = serde_yaml::from_str(&content)
            .context("Failed to parse YAML configuration")?;

        Self::validate(&config)?;

        Ok(config)
    }

    /// Substitute ${VAR} and ${VAR:-default} patterns with environment variables
    ///
    /// Examples:
    /// - ${HOME} -> /home/user
    /// - ${SSH_PORT:-22} -> 22 (if SSH_PORT not set)
    fn substitute_env_vars(content: &str) -> String {
        let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]+))?\}").unwrap();

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str());

            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => match default_value {
                    Some(default) => default.to_string(),
                    // Keep original if no default and var not found
                    None => format!("${{{}}}", var_name),
                },
            }
        })
        .to_string()
    }

    /// Validate configuration
    pub fn validate(config: &AppConfig) -> Result<()> {
        if config.storage.max_workers == 0 {
            bail!("storage.max_workers must be > 0");
        }

        if config.storage.list_queue_capacity == 0 {
            bail!("storage.list_queue_capacity must be > 0");
        }

        if let Some(remote) = &config.remote {
            if remote.host.is_empty() {
                bail!("remote.host cannot be empty");
            }
            if remote.username.is_empty() {
                bail!("remote.username cannot be empty");
            }
            if remote.port == 0 {
                bail!("remote.port must be > 0");
            }
        }

        match config.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => bail!("Unknown logging.level: '{}'", other),
        }

        Ok(())
    }
}
