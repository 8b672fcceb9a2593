//! Logs module — line model, marker detection, classification and grouping.

pub mod model;
pub mod pattern;
pub mod depth;
pub mod buffer;
pub mod classify;
pub mod group;

pub use classify::{classify, Decision, Rule};
pub use group::{EntrySender, MultilineCollector};
pub use model::{Level, LogEntry, Message};
