//! Backend over the host filesystem.

use std::ffi::OsString;
use std::io;
use std::path::Path;

use crate::backend::FsBackend;
use crate::types::EntryKind;

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFs;

#[async_trait::async_trait]
impl FsBackend for TokioFs {
    async fn lstat(&self, path: &Path) -> io::Result<EntryKind> {
        let meta = tokio::fs::symlink_metadata(path).await?;
        Ok(EntryKind::from_file_type(meta.file_type()))
    }

    async fn list(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name());
        }
        Ok(names)
    }
}
