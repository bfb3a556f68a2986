//! Query options

use bytes::Bytes;

/// Page size used when none is configured
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Per-query scan options
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOpts {
    /// Explicit first key; overrides any key derived from criteria
    pub start_key: Option<Bytes>,

    /// Key to stop before
    pub stop_key: Option<Bytes>,

    /// Date component for index start keys
    pub start_time: Option<i64>,

    /// Maximum rows per query; `None` is unbounded
    pub page_size: Option<usize>,

    /// Allow index scans
    pub use_indexes: bool,
}

impl Default for QueryOpts {
    fn default() -> Self {
        Self {
            start_key: None,
            stop_key: None,
            start_time: None,
            page_size: Some(DEFAULT_PAGE_SIZE),
            use_indexes: true,
        }
    }
}

impl QueryOpts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_key(mut self, key: impl Into<Bytes>) -> Self {
        self.start_key = Some(key.into());
        self
    }

    pub fn stop_key(mut self, key: impl Into<Bytes>) -> Self {
        self.stop_key = Some(key.into());
        self
    }

    pub fn start_time(mut self, millis: i64) -> Self {
        self.start_time = Some(millis);
        self
    }

    pub fn page_size(mut self, size: Option<usize>) -> Self {
        self.page_size = size;
        self
    }

    pub fn use_indexes(mut self, enabled: bool) -> Self {
        self.use_indexes = enabled;
        self
    }
}
