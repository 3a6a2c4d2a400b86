// file: src/config/loader.rs
// version: 1.0.0
// guid: 91c50e2a-7d3f-4b68-8a94-e6b13d27c085

//! Configuration file loading and environment variable substitution

use super::RunnerConfig;
use crate::Result;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
    env_vars: HashMap<String, String>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self {
            env_vars: std::env::vars().collect(),
        }
    }

    /// Load runner defaults
    ///
    /// An explicitly given path must exist; the default location
    /// (`<config dir>/runstage/config.yaml`) is optional and silently
    /// falls back to built-in defaults when absent.
    pub fn load(&self, explicit: Option<&Path>) -> Result<RunnerConfig> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(crate::error::RunnerError::config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => match Self::default_config_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(RunnerConfig::default()),
            },
        };

        self.load_file(&path)
    }

    /// Load and validate a defaults file
    pub fn load_file(&self, path: &Path) -> Result<RunnerConfig> {
        let content = fs::read_to_string(path).map_err(|e| {
            crate::error::RunnerError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let expanded = self.expand_env_vars(&content)?;
        let config: RunnerConfig = serde_yaml::from_str(&expanded)?;

        config.validate()?;

        Ok(config)
    }

    /// Default config file location
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("runstage").join("config.yaml"))
    }

    /// Expand `${VAR}` references in configuration content
    fn expand_env_vars(&self, content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| crate::error::RunnerError::config(format!("Invalid regex pattern: {}", e)))?;

        let mut result = content.to_string();
        let mut missing_vars = Vec::new();

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];

            if let Some(value) = self.env_vars.get(var_name) {
                result = result.replace(placeholder, value);
            } else {
                missing_vars.push(var_name.to_string());
            }
        }

        if !missing_vars.is_empty() {
            return Err(crate::error::RunnerError::config(format!(
                "Missing environment variables: {}",
                missing_vars.join(", ")
            )));
        }

        Ok(result)
    }

    /// Set environment variable for substitution
    pub fn set_env_var(&mut self, key: String, value: String) {
        self.env_vars.insert(key, value);
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
