//! Engine configuration.
//!
//! Settings are passed explicitly to the components that need them. They can
//! be built in code, parsed from JSON, or read from `GENFLOW_*` environment
//! variables.

mod env;
mod settings;

pub use settings::{
    AuthSettings, CollectionSettings, CompletionSettings, EngineConfig, LogSettings,
};
