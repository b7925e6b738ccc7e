//! Engine configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via ACTIVEFSM_CONFIG)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the YAML config file.
pub const CONFIG_ENV: &str = "ACTIVEFSM_CONFIG";

/// How guard actions affect a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardPolicy {
    /// Guards run after the exit actions; their outcome never gates the
    /// transition. A failing guard is an action fault like any other.
    #[default]
    Advisory,
    /// Guards run before the exit actions; a failing guard rejects the
    /// transition and leaves the state unchanged.
    Enforcing,
}

/// Worker restart policy after an action fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartConfig {
    /// Restart the worker after a fault.
    pub enabled: bool,
    /// Restarts allowed within `window_secs` (0 = unlimited).
    pub max_restarts: u32,
    /// Sliding window for `max_restarts`.
    pub window_secs: u64,
    /// Pause before each restart.
    pub backoff_ms: u64,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_restarts: 5,
            window_secs: 60,
            backoff_ms: 100,
        }
    }
}

impl RestartConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(enabled) = std::env::var("ACTIVEFSM_RESTART_ENABLED") {
            self.enabled = enabled == "1" || enabled.to_lowercase() == "true";
        }

        if let Ok(max) = std::env::var("ACTIVEFSM_MAX_RESTARTS") {
            if let Ok(n) = max.parse() {
                self.max_restarts = n;
            }
        }

        if let Ok(window) = std::env::var("ACTIVEFSM_RESTART_WINDOW_SECS") {
            if let Ok(secs) = window.parse() {
                self.window_secs = secs;
            }
        }

        if let Ok(backoff) = std::env::var("ACTIVEFSM_RESTART_BACKOFF_MS") {
            if let Ok(ms) = backoff.parse() {
                self.backoff_ms = ms;
            }
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_restarts == 0
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine name, used as the source of every event.
    pub name: String,
    /// Trigger queue capacity.
    pub queue_capacity: usize,
    /// Upper bound on how long `stop()` waits for the worker (0 = forever).
    pub shutdown_timeout_ms: u64,
    pub guard_policy: GuardPolicy,
    /// Capacity of the broadcast channel for async subscribers.
    pub event_channel_capacity: usize,
    pub restart: RestartConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "state-machine".to_string(),
            queue_capacity: 16,
            shutdown_timeout_ms: 5000,
            guard_policy: GuardPolicy::Advisory,
            event_channel_capacity: 1024,
            restart: RestartConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: EngineConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(name) = std::env::var("ACTIVEFSM_NAME") {
            if !name.is_empty() {
                self.name = name;
            }
        }

        if let Ok(capacity) = std::env::var("ACTIVEFSM_QUEUE_CAPACITY") {
            if let Ok(n) = capacity.parse() {
                self.queue_capacity = n;
            }
        }

        if let Ok(timeout) = std::env::var("ACTIVEFSM_SHUTDOWN_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.shutdown_timeout_ms = ms;
            }
        }

        if let Ok(policy) = std::env::var("ACTIVEFSM_GUARD_POLICY") {
            self.guard_policy = match policy.to_lowercase().as_str() {
                "enforcing" => GuardPolicy::Enforcing,
                _ => GuardPolicy::Advisory,
            };
        }

        self.restart.apply_env_overrides();
    }

    /// Checks values that would make the engine unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Validation(
                "queue_capacity must be greater than zero".to_string(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(ConfigError::Validation(
                "event_channel_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Ok(())
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_guard_policy(mut self, policy: GuardPolicy) -> Self {
        self.guard_policy = policy;
        self
    }

    pub fn with_restart(mut self, restart: RestartConfig) -> Self {
        self.restart = restart;
        self
    }

    /// Returns the shutdown bound, `None` meaning wait forever.
    pub fn shutdown_timeout(&self) -> Option<Duration> {
        match self.shutdown_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file '{}': {}", .0.display(), .1)]
    Parse(PathBuf, String),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}
