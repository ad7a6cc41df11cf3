use std::ffi::OsString;
use std::io;
use std::path::Path;

use crate::types::EntryKind;

/// Filesystem primitives the walker is built on.
#[async_trait::async_trait]
pub trait FsBackend: Send + Sync + 'static {
    /// Type of the entry at `path`, without following a trailing symlink.
    async fn lstat(&self, path: &Path) -> io::Result<EntryKind>;

    /// Names of the immediate children of the directory at `path`.
    async fn list(&self, path: &Path) -> io::Result<Vec<OsString>>;
}
