use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use curio_contracts::error::{CoreError, Result};
use curio_contracts::media_backend::{MediaBackend, MediaMetadata};
use ffmpeg_next as ffmpeg;
use image::imageops::FilterType;
use image::GenericImageView;

const STILL_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "jxl", "avif"];

/// Decodes with `ffmpeg-next` (covers both still images and video frames)
/// and resizes/encodes thumbnails with `image`.
///
/// `spec.md` §4.5's obligations: zeroed metadata on unreadable input, a
/// non-empty destination file or a backend error, and a video frame chosen
/// by `min(duration - 50ms, clamp(duration * 0.2, 250ms, 10s))`, never the
/// first frame and never past EOF.
#[derive(Debug, Clone, Default)]
pub struct FfmpegMediaBackend;

impl FfmpegMediaBackend {
    pub fn new() -> Self {
        ffmpeg::init().ok();
        Self
    }
}

#[async_trait]
impl MediaBackend for FfmpegMediaBackend {
    async fn get_metadata(&self, path: &Path) -> Result<MediaMetadata> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || get_metadata_blocking(&path))
            .await
            .map_err(|e| CoreError::Fatal(e.to_string()))?
    }

    async fn generate_thumbnail(&self, src: &Path, dst: &Path, max_edge: u32) -> Result<()> {
        let src = src.to_path_buf();
        let dst = dst.to_path_buf();
        tokio::task::spawn_blocking(move || generate_thumbnail_blocking(&src, &dst, max_edge))
            .await
            .map_err(|e| CoreError::Fatal(e.to_string()))?
    }

    async fn compute_perceptual_hash(&self, path: &Path) -> Result<String> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || compute_perceptual_hash_blocking(&path))
            .await
            .map_err(|e| CoreError::Fatal(e.to_string()))?
    }
}

fn is_still_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| STILL_IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn get_metadata_blocking(path: &Path) -> Result<MediaMetadata> {
    let ictx = match ffmpeg::format::input(&path) {
        Ok(ictx) => ictx,
        Err(_) => return Ok(MediaMetadata::default()),
    };

    let stream = match ictx.streams().best(ffmpeg::media::Type::Video) {
        Some(s) => s,
        None => return Ok(MediaMetadata::default()),
    };

    let decoder = match ffmpeg::codec::context::Context::from_parameters(stream.parameters())
        .and_then(|c| c.decoder().video())
    {
        Ok(d) => d,
        Err(_) => return Ok(MediaMetadata::default()),
    };

    let format = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let content_type = crate::media_source::extensions::content_type_for_extension(&format);

    Ok(MediaMetadata {
        width: decoder.width(),
        height: decoder.height(),
        format,
        content_type,
    })
}

fn generate_thumbnail_blocking(src: &Path, dst: &Path, max_edge: u32) -> Result<()> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| CoreError::BackendFailure(format!("creating thumbnail dir: {e}")))?;
    }

    let frame = if is_still_image(src) {
        decode_still_image(src)?
    } else {
        decode_video_frame(src)?
    };

    let (w, h) = frame.dimensions();
    let scale = f64::from(max_edge) / f64::from(w.max(h));
    let resized = if scale < 1.0 {
        let new_w = ((w as f64) * scale).round().max(1.0) as u32;
        let new_h = ((h as f64) * scale).round().max(1.0) as u32;
        image::DynamicImage::ImageRgb8(frame).resize(new_w, new_h, FilterType::Lanczos3)
    } else {
        image::DynamicImage::ImageRgb8(frame)
    };

    let tmp_dst = tmp_path_for(dst);
    resized
        .save_with_format(&tmp_dst, image::ImageFormat::Jpeg)
        .map_err(|e| CoreError::BackendFailure(format!("encoding thumbnail: {e}")))?;

    let metadata = std::fs::metadata(&tmp_dst).ok();
    if metadata.map(|m| m.len()).unwrap_or(0) == 0 {
        let _ = std::fs::remove_file(&tmp_dst);
        return Err(CoreError::BackendFailure(
            "thumbnail encoder produced an empty file".to_string(),
        ));
    }

    std::fs::rename(&tmp_dst, dst)
        .map_err(|e| CoreError::BackendFailure(format!("finalizing thumbnail: {e}")))?;

    Ok(())
}

fn tmp_path_for(dst: &Path) -> PathBuf {
    let mut tmp = dst.to_path_buf();
    let file_name = dst
        .file_name()
        .map(|n| format!(".{}.tmp", n.to_string_lossy()))
        .unwrap_or_else(|| ".thumbnail.tmp".to_string());
    tmp.set_file_name(file_name);
    tmp
}

fn decode_still_image(path: &Path) -> Result<image::RgbImage> {
    let img = image::open(path)
        .map_err(|e| CoreError::BackendFailure(format!("decoding image: {e}")))?;
    Ok(img.to_rgb8())
}

/// Picks the frame timestamp per the formula in §4.5, decodes the nearest
/// keyframe-or-later packet, converts it to RGB8 via `scaling::Context`.
fn decode_video_frame(path: &Path) -> Result<image::RgbImage> {
    let mut ictx = ffmpeg::format::input(&path)
        .map_err(|e| CoreError::BackendFailure(format!("opening video: {e}")))?;

    let stream_index;
    let time_base;
    let duration_secs;
    {
        let stream = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| CoreError::BackendFailure("no video stream".to_string()))?;
        stream_index = stream.index();
        time_base = stream.time_base();
        duration_secs = stream.duration() as f64 * f64::from(time_base.numerator())
            / f64::from(time_base.denominator());
    }

    let target = target_frame_time(Duration::from_secs_f64(duration_secs.max(0.0)));
    let target_secs = target.as_secs_f64();
    let target_ts = (target_secs * f64::from(time_base.denominator())
        / f64::from(time_base.numerator())) as i64;

    ictx.seek(target_ts, ..target_ts)
        .map_err(|e| CoreError::BackendFailure(format!("seeking: {e}")))?;

    let context_decoder = ffmpeg::codec::context::Context::from_parameters(
        ictx.stream(stream_index)
            .ok_or_else(|| CoreError::BackendFailure("stream vanished".to_string()))?
            .parameters(),
    )
    .map_err(|e| CoreError::BackendFailure(format!("building decoder: {e}")))?;
    let mut decoder = context_decoder
        .decoder()
        .video()
        .map_err(|e| CoreError::BackendFailure(format!("opening video decoder: {e}")))?;

    let mut scaler = ffmpeg::software::scaling::Context::get(
        decoder.format(),
        decoder.width(),
        decoder.height(),
        ffmpeg::format::Pixel::RGB24,
        decoder.width(),
        decoder.height(),
        ffmpeg::software::scaling::Flags::BILINEAR,
    )
    .map_err(|e| CoreError::BackendFailure(format!("building scaler: {e}")))?;

    let mut decoded = ffmpeg::util::frame::Video::empty();
    for (stream, packet) in ictx.packets() {
        if stream.index() != stream_index {
            continue;
        }
        decoder
            .send_packet(&packet)
            .map_err(|e| CoreError::BackendFailure(format!("decoding packet: {e}")))?;
        if decoder.receive_frame(&mut decoded).is_ok() {
            let mut rgb = ffmpeg::util::frame::Video::empty();
            scaler
                .run(&decoded, &mut rgb)
                .map_err(|e| CoreError::BackendFailure(format!("scaling frame: {e}")))?;
            return frame_to_image(&rgb);
        }
    }

    Err(CoreError::BackendFailure(
        "no decodable frame before EOF".to_string(),
    ))
}

fn target_frame_time(duration: Duration) -> Duration {
    let last_safe = duration.saturating_sub(Duration::from_millis(50));
    let scaled = duration.mul_f64(0.2);
    let clamped = scaled
        .max(Duration::from_millis(250))
        .min(Duration::from_secs(10));
    clamped.min(last_safe)
}

fn frame_to_image(frame: &ffmpeg::util::frame::Video) -> Result<image::RgbImage> {
    let width = frame.width();
    let height = frame.height();
    let stride = frame.stride(0);
    let data = frame.data(0);

    let mut buf = Vec::with_capacity((width * height * 3) as usize);
    for row in 0..height as usize {
        let start = row * stride;
        buf.extend_from_slice(&data[start..start + width as usize * 3]);
    }

    image::RgbImage::from_raw(width, height, buf)
        .ok_or_else(|| CoreError::BackendFailure("frame buffer size mismatch".to_string()))
}

/// Average-hash over a 16x16 grayscale downsample: 256 bits, one per
/// pixel, set when the pixel is at or above the image's mean luminance.
/// Deterministic under identical input bytes; robust to small visual
/// perturbations since neighboring downsampled pixels move together.
fn compute_perceptual_hash_blocking(path: &Path) -> Result<String> {
    if !is_still_image(path) {
        return Err(CoreError::InvalidInput(
            "perceptual hashing is only supported for image inputs".to_string(),
        ));
    }

    let img = image::open(path)
        .map_err(|e| CoreError::BackendFailure(format!("decoding image: {e}")))?
        .resize_exact(16, 16, FilterType::Triangle)
        .to_luma8();

    let pixels: Vec<u32> = img.pixels().map(|p| p.0[0] as u32).collect();
    let mean: u32 = pixels.iter().sum::<u32>() / pixels.len().max(1) as u32;

    let mut bytes = [0u8; 32];
    for (i, &p) in pixels.iter().enumerate() {
        if p >= mean {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }

    Ok(hex::encode(bytes))
}
