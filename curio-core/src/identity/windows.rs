use std::os::windows::io::AsRawHandle;
use std::path::Path;

use async_trait::async_trait;
use curio_contracts::error::Result;
use curio_contracts::identity::{FileIdentity, FileIdentityResolver};
use windows_sys::Win32::Storage::FileSystem::{GetFileInformationByHandle, BY_HANDLE_FILE_INFORMATION};

/// Resolves `(volume serial number, file index)` via
/// `GetFileInformationByHandle`, opening the file once for read.
#[derive(Debug, Clone, Default)]
pub struct WindowsFileIdentityResolver;

#[async_trait]
impl FileIdentityResolver for WindowsFileIdentityResolver {
    async fn try_resolve(&self, full_path: &Path) -> Result<Option<FileIdentity>> {
        let path = full_path.to_path_buf();
        let identity = tokio::task::spawn_blocking(move || resolve_blocking(&path))
            .await
            .map_err(|e| curio_contracts::error::CoreError::Fatal(e.to_string()))??;
        Ok(identity)
    }
}

fn resolve_blocking(path: &Path) -> std::io::Result<Option<FileIdentity>> {
    let file = std::fs::File::open(path)?;
    let handle = file.as_raw_handle();

    let mut info: BY_HANDLE_FILE_INFORMATION = unsafe { std::mem::zeroed() };
    let ok = unsafe { GetFileInformationByHandle(handle as _, &mut info) };
    if ok == 0 {
        return Ok(None);
    }

    let file_index = ((info.nFileIndexHigh as u64) << 32) | info.nFileIndexLow as u64;

    Ok(Some(FileIdentity {
        device: info.dwVolumeSerialNumber.to_string(),
        value: file_index.to_string(),
    }))
}
