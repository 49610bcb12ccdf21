//! Configuration for respkv
//!
//! Centralized configuration with sensible defaults.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use crate::error::{KvError, Result};

/// Main configuration for a respkv server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address (port 0 picks an ephemeral port)
    pub listen_addr: String,

    /// Max concurrent client connections (0 = unlimited)
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Lifecycle Configuration
    // -------------------------------------------------------------------------
    /// Connections idle for longer than this are reaped (milliseconds, 0 = never)
    pub idle_timeout_ms: u64,

    /// How often the idle reaper scans the connection table (milliseconds)
    pub reap_interval_ms: u64,

    /// Upper bound on waiting for connection workers during shutdown (milliseconds)
    pub shutdown_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:6379".to_string(),
            max_connections: 1000,
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
            idle_timeout_ms: 5 * 60 * 1000, // 5 minutes
            reap_interval_ms: 1000,
            shutdown_timeout_ms: 10_000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the configuration can actually be served
    pub fn validate(&self) -> Result<()> {
        self.resolve_listen_addr()?;

        if self.shutdown_timeout_ms == 0 {
            return Err(KvError::Config(
                "shutdown timeout must be greater than zero".to_string(),
            ));
        }
        if self.idle_timeout_ms > 0 && self.reap_interval_ms == 0 {
            return Err(KvError::Config(
                "reap interval must be greater than zero when idle reaping is enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve `listen_addr` to the first socket address it names
    pub fn resolve_listen_addr(&self) -> Result<SocketAddr> {
        self.listen_addr
            .to_socket_addrs()
            .map_err(|e| KvError::Config(format!("invalid listen address '{}': {}", self.listen_addr, e)))?
            .next()
            .ok_or_else(|| KvError::Config(format!("listen address '{}' resolved to nothing", self.listen_addr)))
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.write_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.idle_timeout_ms)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_millis(self.reap_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

fn non_zero_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the idle reaping threshold (in milliseconds)
    pub fn idle_timeout_ms(mut self, ms: u64) -> Self {
        self.config.idle_timeout_ms = ms;
        self
    }

    /// Set how often the idle reaper runs (in milliseconds)
    pub fn reap_interval_ms(mut self, ms: u64) -> Self {
        self.config.reap_interval_ms = ms;
        self
    }

    /// Set the shutdown wait bound (in milliseconds)
    pub fn shutdown_timeout_ms(mut self, ms: u64) -> Self {
        self.config.shutdown_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
