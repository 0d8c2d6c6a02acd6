use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use async_trait::async_trait;
use curio_contracts::error::Result;
use curio_contracts::hashing::ContentHasher;
use xxhash_rust::xxh3::Xxh3;

const BLOCK_SIZE: u64 = 64 * 1024;

/// `spec.md` §4.4's fingerprint: size prefix, head block, tail block (when
/// the file is large enough that the two don't already overlap), fed into
/// a streaming 64-bit non-cryptographic hash.
#[derive(Debug, Clone, Default)]
pub struct XxHashContentHasher;

#[async_trait]
impl ContentHasher for XxHashContentHasher {
    async fn compute_content_hash(&self, path: &Path) -> Result<String> {
        let path = path.to_path_buf();
        let digest = tokio::task::spawn_blocking(move || compute_blocking(&path))
            .await
            .map_err(|e| curio_contracts::error::CoreError::Fatal(e.to_string()))??;
        Ok(digest)
    }
}

fn compute_blocking(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let size = file.metadata()?.len();

    let mut hasher = Xxh3::new();
    hasher.update(&size.to_le_bytes());

    let mut buf = vec![0u8; BLOCK_SIZE as usize];

    let head_read = read_at(&mut file, 0, &mut buf)?;
    hasher.update(&buf[..head_read]);

    if size > 2 * BLOCK_SIZE {
        let tail_offset = size - BLOCK_SIZE;
        let tail_read = read_at(&mut file, tail_offset, &mut buf)?;
        hasher.update(&buf[..tail_read]);
    }

    let digest = hasher.digest();
    Ok(format!("{digest:016x}"))
}

fn read_at(file: &mut std::fs::File, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
    file.seek(SeekFrom::Start(offset))?;
    let mut total = 0;
    loop {
        match file.read(&mut buf[total..])? {
            0 => break,
            n => {
                total += n;
                if total == buf.len() {
                    break;
                }
            }
        }
    }
    Ok(total)
}
