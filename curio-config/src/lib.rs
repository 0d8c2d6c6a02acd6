//! Layered configuration for the Curio indexing engine.

mod error;
mod settings;

pub use error::ConfigError;
pub use settings::{
    IngestionSettings, PerceptualSimilaritySettings, ProcessingSettings, ScannerSettings,
    Settings, StorageSettings,
};
