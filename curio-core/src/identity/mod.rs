//! Filesystem-stable file identity resolution, one implementation per
//! platform primitive.

#[cfg(unix)]
pub mod unix;
#[cfg(windows)]
pub mod windows;

#[cfg(unix)]
pub use unix::UnixFileIdentityResolver as PlatformFileIdentityResolver;
#[cfg(windows)]
pub use windows::WindowsFileIdentityResolver as PlatformFileIdentityResolver;
