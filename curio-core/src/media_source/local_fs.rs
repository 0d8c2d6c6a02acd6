use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use curio_contracts::error::Result;
use curio_contracts::media_source::{MediaSource, MediaSourceEntry, MediaSourceStream};
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;
use walkdir::WalkDir;

use super::extensions::is_supported;

/// Enumerates a directory tree on the local filesystem (or anything
/// mounted to look like one).
///
/// `walkdir` does its own blocking syscalls, so traversal runs on a
/// blocking task and feeds a bounded channel the async side drains as a
/// stream — the "producer task writing to a bounded channel" pattern for
/// async streaming enumerators.
#[derive(Debug, Clone, Default)]
pub struct LocalFsMediaSource;

impl LocalFsMediaSource {
    pub fn new() -> Self {
        Self
    }

    fn entry_for(root: &Path, path: &Path) -> Option<MediaSourceEntry> {
        let extension = path.extension()?.to_str()?;
        if !is_supported(extension) {
            return None;
        }

        let metadata = std::fs::metadata(path).ok()?;
        if !metadata.is_file() {
            return None;
        }
        if is_hidden_or_system(path) {
            return None;
        }

        let relative_path = path
            .strip_prefix(root)
            .ok()?
            .to_string_lossy()
            .replace('\\', "/");

        let last_modified_utc: DateTime<Utc> = metadata.modified().ok()?.into();

        Some(MediaSourceEntry {
            full_path: path.to_path_buf(),
            relative_path,
            size_bytes: metadata.len(),
            last_modified_utc,
        })
    }
}

fn is_hidden_or_system(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

#[async_trait]
impl MediaSource for LocalFsMediaSource {
    fn enumerate(&self, root: &Path) -> MediaSourceStream {
        let root = root.to_path_buf();
        let (tx, rx) = tokio::sync::mpsc::channel(256);

        tokio::task::spawn_blocking(move || {
            for dir_entry in WalkDir::new(&root)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path: PathBuf = dir_entry.into_path();
                if let Some(entry) = LocalFsMediaSource::entry_for(&root, &path) {
                    if tx.blocking_send(entry).is_err() {
                        break;
                    }
                } else {
                    debug!(path = %path.display(), "skipping unsupported or unstatable file");
                }
            }
        });

        Box::pin(ReceiverStream::new(rx))
    }

    async fn count(&self, root: &Path) -> Result<u64> {
        let root = root.to_path_buf();
        let count = tokio::task::spawn_blocking(move || {
            WalkDir::new(&root)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| LocalFsMediaSource::entry_for(&root, e.path()).is_some())
                .count() as u64
        })
        .await
        .map_err(|e| curio_contracts::error::CoreError::Fatal(e.to_string()))?;
        Ok(count)
    }
}
