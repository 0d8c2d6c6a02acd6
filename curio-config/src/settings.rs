//! Typed, layered settings for the indexing engine.
//!
//! Layering order, lowest to highest precedence: built-in defaults, an
//! optional TOML file, then `CURIO_`-prefixed environment variables (e.g.
//! `CURIO_SCANNER__PARALLELISM=8`, double underscore as the section
//! separator, matching the `config` crate's default `Environment`
//! convention).

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    /// Bounded-parallelism width for Phase 1 streaming classification.
    pub parallelism: usize,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            parallelism: num_cpus::get(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessingSettings {
    pub thumbnail_parallelism: usize,
    pub metadata_parallelism: usize,
    pub similarity_parallelism: usize,
    pub job_progress_report_interval_ms: u64,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        let cpus = num_cpus::get();
        Self {
            thumbnail_parallelism: cpus,
            metadata_parallelism: cpus,
            similarity_parallelism: cpus,
            job_progress_report_interval_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    pub batch_size: usize,
    pub channel_capacity: usize,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            batch_size: 50,
            channel_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Resolved against the content root at startup; never used relative
    /// to the process's current directory once loaded.
    pub thumbnail_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            thumbnail_path: PathBuf::from("thumbnails"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PerceptualSimilaritySettings {
    pub hamming_threshold: u32,
}

impl Default for PerceptualSimilaritySettings {
    fn default() -> Self {
        Self {
            hamming_threshold: 31,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scanner: ScannerSettings,
    pub processing: ProcessingSettings,
    pub ingestion: IngestionSettings,
    pub storage: StorageSettings,
    pub perceptual_similarity: PerceptualSimilaritySettings,
}

impl Settings {
    /// Loads defaults, layers an optional TOML file at `config_path` (if
    /// it exists), then layers `CURIO_`-prefixed environment variables.
    pub fn load(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let defaults = Settings::default();

        let mut builder = config::Config::builder()
            .set_default("scanner.parallelism", defaults.scanner.parallelism as i64)?
            .set_default(
                "processing.thumbnail_parallelism",
                defaults.processing.thumbnail_parallelism as i64,
            )?
            .set_default(
                "processing.metadata_parallelism",
                defaults.processing.metadata_parallelism as i64,
            )?
            .set_default(
                "processing.similarity_parallelism",
                defaults.processing.similarity_parallelism as i64,
            )?
            .set_default(
                "processing.job_progress_report_interval_ms",
                defaults.processing.job_progress_report_interval_ms as i64,
            )?
            .set_default("ingestion.batch_size", defaults.ingestion.batch_size as i64)?
            .set_default(
                "ingestion.channel_capacity",
                defaults.ingestion.channel_capacity as i64,
            )?
            .set_default(
                "storage.thumbnail_path",
                defaults.storage.thumbnail_path.to_string_lossy().to_string(),
            )?
            .set_default(
                "perceptual_similarity.hamming_threshold",
                defaults.perceptual_similarity.hamming_threshold as i64,
            )?;

        if let Some(path) = config_path {
            if path.exists() {
                builder = builder.add_source(config::File::from(path));
            } else {
                tracing::debug!(path = %path.display(), "no config file at path, using defaults");
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CURIO")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scanner.parallelism == 0 {
            return Err(ConfigError::Invalid(
                "scanner.parallelism must be at least 1".into(),
            ));
        }
        if self.ingestion.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "ingestion.batch_size must be at least 1".into(),
            ));
        }
        if self.ingestion.channel_capacity < 10 {
            return Err(ConfigError::Invalid(
                "ingestion.channel_capacity must be at least 10".into(),
            ));
        }
        Ok(())
    }
}
