//! Configuration for colmap
//!
//! Centralized configuration with sensible defaults.

use crate::error::{ColmapError, Result};

/// Main configuration for a colmap instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Table Pool Configuration
    // -------------------------------------------------------------------------
    /// Max number of table handles checked out at once (across all tables)
    pub pool_max_handles: usize,

    /// How long `acquire` waits for a free handle (milliseconds)
    pub pool_acquire_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Query Configuration
    // -------------------------------------------------------------------------
    /// Page size for queries created by a service
    pub default_page_size: usize,

    /// Whether queries may use secondary index tables by default
    pub use_indexes: bool,

    // -------------------------------------------------------------------------
    // Store Configuration
    // -------------------------------------------------------------------------
    /// Create unknown tables on first open (in-memory store only)
    pub auto_create_tables: bool,

    /// Rows copied out of a table per read-lock hold during a scan
    pub scan_batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool_max_handles: 100,
            pool_acquire_timeout_ms: 5000,
            default_page_size: 50,
            use_indexes: true,
            auto_create_tables: true,
            scan_batch_size: 64,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the config for values that can never work
    pub fn validate(&self) -> Result<()> {
        if self.pool_max_handles == 0 {
            return Err(ColmapError::Config(
                "pool_max_handles must be at least 1".to_string(),
            ));
        }
        if self.default_page_size == 0 {
            return Err(ColmapError::Config(
                "default_page_size must be at least 1".to_string(),
            ));
        }
        if self.scan_batch_size == 0 {
            return Err(ColmapError::Config(
                "scan_batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the maximum number of checked-out table handles
    pub fn pool_max_handles(mut self, count: usize) -> Self {
        self.config.pool_max_handles = count;
        self
    }

    /// Set the pool acquire timeout (in milliseconds)
    pub fn pool_acquire_timeout_ms(mut self, ms: u64) -> Self {
        self.config.pool_acquire_timeout_ms = ms;
        self
    }

    /// Set the default query page size
    pub fn default_page_size(mut self, size: usize) -> Self {
        self.config.default_page_size = size;
        self
    }

    /// Enable or disable index usage for new queries
    pub fn use_indexes(mut self, enabled: bool) -> Self {
        self.config.use_indexes = enabled;
        self
    }

    /// Enable or disable automatic table creation
    pub fn auto_create_tables(mut self, enabled: bool) -> Self {
        self.config.auto_create_tables = enabled;
        self
    }

    /// Set how many rows a scan fetches per batch
    pub fn scan_batch_size(mut self, size: usize) -> Self {
        self.config.scan_batch_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
