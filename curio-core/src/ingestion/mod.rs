pub mod pipeline;

pub use pipeline::PostIngestionPipeline;
