use crate::circuit_breaker::CircuitBreakerConfig;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Admin server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Default retry policy for the facade
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Default configuration for lazily created breakers
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    /// Breakers registered at startup with their own configuration
    #[serde(default)]
    pub services: BTreeMap<String, CircuitBreakerConfig>,
}

/// Admin server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Expose Prometheus metrics on /metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            metrics_enabled: default_true(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl ResilienceConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("Retry max_attempts must be >= 1".to_string()));
        }

        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(Error::Config(format!(
                "Retry base_delay_ms ({}) cannot exceed max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }

        validate_breaker("circuit_breaker", &self.circuit_breaker)?;

        for (name, breaker) in &self.services {
            if name.trim().is_empty() {
                return Err(Error::Config("Service name cannot be empty".to_string()));
            }
            validate_breaker(name, breaker)?;
        }

        Ok(())
    }
}

fn validate_breaker(name: &str, config: &CircuitBreakerConfig) -> Result<()> {
    if config.failure_threshold == 0 {
        return Err(Error::Config(format!("failure_threshold must be > 0 for: {}", name)));
    }
    if config.success_threshold == 0 {
        return Err(Error::Config(format!("success_threshold must be > 0 for: {}", name)));
    }
    if config.half_open_max_calls == 0 {
        return Err(Error::Config(format!("half_open_max_calls must be > 0 for: {}", name)));
    }
    Ok(())
}
