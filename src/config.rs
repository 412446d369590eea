//! Configuration for the message board
//!
//! Centralized configuration with sensible defaults, for both the server and
//! the user application.

use std::path::PathBuf;

/// Default port shared by the UDP control plane and the TCP data plane
pub const DEFAULT_PORT: u16 = 58018;

/// Default per-read timeout (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Default number of attempts for a UDP request
pub const DEFAULT_UDP_RETRIES: u32 = 3;

/// Main configuration for a server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for the entity store
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── USERS/       (one directory per user)
    ///     ├── GROUPS/      (one directory per group)
    ///     └── STAGING/     (uploads in flight)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Listen address; UDP and TCP bind the same port
    pub listen_addr: String,

    /// Max concurrent TCP connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Diagnostics
    // -------------------------------------------------------------------------
    /// Log every decoded request with its peer address
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./msgboard_data"),
            listen_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            max_connections: 64,
            read_timeout_ms: DEFAULT_TIMEOUT_MS,
            write_timeout_ms: DEFAULT_TIMEOUT_MS,
            verbose: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the listen address (host:port)
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

    /// Enable or disable per-request logging
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// Configuration for the user application
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server hostname or IPv4 address
    pub server_host: String,

    /// Server port (UDP and TCP)
    pub server_port: u16,

    /// Per-read timeout (milliseconds)
    pub timeout_ms: u64,

    /// Attempts for a UDP request before giving up
    pub udp_retries: u32,

    /// Where retrieved files are written
    pub download_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: DEFAULT_PORT,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            udp_retries: DEFAULT_UDP_RETRIES,
            download_dir: PathBuf::from("."),
        }
    }
}

impl ClientConfig {
    /// `host:port` string for socket address resolution
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
