//! Conf module — collector configuration model and loading.

pub mod model;
pub mod load;

pub use model::CollectorConfig;
