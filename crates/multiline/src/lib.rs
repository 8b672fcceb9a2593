// Module layout for the multiline collector.

// Core
pub mod logs;

// Infrastructure
pub mod conf;
pub mod error;
pub mod runtime;

pub use conf::CollectorConfig;
pub use logs::{EntrySender, Level, LogEntry, Message, MultilineCollector};
