//! Model registry.
//!
//! One table keyed by model identifier holds both the upstream endpoint used
//! for routing and the display metadata used for the `/v1/models` listing,
//! so the two can never disagree about which models exist.

mod table;

pub use table::{ModelEntry, ModelInfo, ModelRegistry};
