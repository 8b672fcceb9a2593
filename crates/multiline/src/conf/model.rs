//! Model — CollectorConfig.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Quiet period after which a pending message is flushed.
    pub timeout_ms: u64,
    /// Byte cap on each message's content.
    pub size_limit: usize,
    /// Emitted messages buffered before the collector waits on the reader.
    pub channel_capacity: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 500,
            size_limit: 64 * 1024,
            channel_capacity: 1024,
        }
    }
}

impl CollectorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_ms == 0 {
            return Err("timeout_ms must be > 0".to_string());
        }
        if self.size_limit == 0 {
            return Err("size_limit must be > 0".to_string());
        }
        if self.channel_capacity == 0 {
            return Err("channel_capacity must be > 0".to_string());
        }
        Ok(())
    }
}
