//! Configuration
//!
//! Plain structs with defaults. [`FolioConfig::from_env`] overlays `FOLIO_*`
//! environment variables on the defaults; unparsable values are ignored.
//!
//! | Variable                 | Field                      | Default |
//! |--------------------------|----------------------------|---------|
//! | `FOLIO_QUERY_ALIAS`      | `query.alias`              | `p`     |
//! | `FOLIO_TREE_MAX_RETRIES` | `tree.max_retries`         | `5`     |
//! | `FOLIO_TREE_BACKOFF_MS`  | `tree.base_backoff_ms`     | `10`    |
//! | `FOLIO_EVENT_CAPACITY`   | `events.capacity`          | `128`   |
//! | `FOLIO_LOG`              | `logging.filter`           | `info`  |

use crate::db::DEFAULT_EVENT_CAPACITY;
use crate::query::DEFAULT_ALIAS;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    pub query: QueryConfig,
    pub tree: TreeConfig,
    pub events: EventsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Alias of the page entity in rendered queries
    pub alias: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            alias: DEFAULT_ALIAS.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Retries after a version conflict (0 = single attempt)
    pub max_retries: usize,
    /// First backoff delay; doubles on every retry
    pub base_backoff_ms: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_backoff_ms: 10,
        }
    }
}

impl TreeConfig {
    /// Delay before retry number `attempt` (0-based)
    pub fn backoff(&self, attempt: usize) -> Duration {
        let factor = 1u64 << attempt.min(10);
        Duration::from_millis(self.base_backoff_ms.saturating_mul(factor))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Broadcast channel capacity
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, used when `RUST_LOG` is unset
    pub filter: String,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            ansi: true,
        }
    }
}

impl FolioConfig {
    /// Defaults overlaid with `FOLIO_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(alias) = lookup("FOLIO_QUERY_ALIAS").filter(|a| !a.trim().is_empty()) {
            config.query.alias = alias.trim().to_string();
        }
        if let Some(retries) = lookup("FOLIO_TREE_MAX_RETRIES").and_then(|v| v.parse::<usize>().ok()) {
            config.tree.max_retries = retries;
        }
        if let Some(backoff) = lookup("FOLIO_TREE_BACKOFF_MS").and_then(|v| v.parse::<u64>().ok()) {
            config.tree.base_backoff_ms = backoff;
        }
        if let Some(capacity) = lookup("FOLIO_EVENT_CAPACITY")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|c| *c > 0)
        {
            config.events.capacity = capacity;
        }
        if let Some(filter) = lookup("FOLIO_LOG").filter(|f| !f.trim().is_empty()) {
            config.logging.filter = filter;
        }

        config
    }
}
