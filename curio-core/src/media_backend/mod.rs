#[cfg(feature = "ffmpeg")]
pub mod ffmpeg_backend;

#[cfg(feature = "ffmpeg")]
pub use ffmpeg_backend::FfmpegMediaBackend;
