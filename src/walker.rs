//! Recursive directory walker.
//!
//! A walk lists one directory, fetches metadata for every child concurrently,
//! keeps non-directories as leaves and descends into each subdirectory on its
//! own tokio task. Any failure at any depth fails the whole walk; there is no
//! partial tree, and no task of the walk is left running once it returns.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, trace, warn};

use crate::backend::FsBackend;
use crate::backends::TokioFs;
use crate::classify::{classify, is_dir};
use crate::error::{WalkError, WalkResult};
use crate::types::{EntryMeta, EntryType, TreeNode};

const DEFAULT_STAT_CONCURRENCY: usize = 64;

/// Walk tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Upper bound on in-flight metadata fetches per directory
    pub stat_concurrency: usize,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            stat_concurrency: DEFAULT_STAT_CONCURRENCY,
        }
    }
}

impl WalkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stat_concurrency(mut self, n: usize) -> Self {
        self.stat_concurrency = n.max(1);
        self
    }
}

/// Builds [`TreeNode`] snapshots over a backend. Must be driven from a tokio runtime.
#[derive(Debug)]
pub struct Walker<B> {
    backend: Arc<B>,
    config: WalkConfig,
}

impl<B> Clone for Walker<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            config: self.config,
        }
    }
}

impl Walker<TokioFs> {
    /// Walker over the host filesystem.
    pub fn local() -> Self {
        Self::new(TokioFs)
    }
}

impl<B: FsBackend> Walker<B> {
    pub fn new(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    pub fn from_arc(backend: Arc<B>) -> Self {
        Self {
            backend,
            config: WalkConfig::default(),
        }
    }

    pub fn with_config(mut self, config: WalkConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &WalkConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Snapshot the tree rooted at `path`.
    ///
    /// `path` itself is not dereferenced: a symlink to a directory is rejected
    /// with [`WalkError::NotADirectory`].
    pub async fn walk(&self, path: impl AsRef<Path>) -> WalkResult<TreeNode> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(WalkError::InvalidArgument(
                "please specify a path to the directory".into(),
            ));
        }

        debug!(path = %path.display(), "walking directory tree");
        let walk = Arc::new(Walk {
            backend: Arc::clone(&self.backend),
            config: self.config,
            cancelled: AtomicBool::new(false),
        });
        let result = walk_root(walk, path.to_path_buf()).await;
        match &result {
            Ok(tree) => debug!(path = %path.display(), nodes = tree.node_count(), "walk finished"),
            Err(e) => warn!(path = %path.display(), error = %e, "walk failed"),
        }
        result
    }
}

/// Snapshot the host directory at `path` with the default configuration.
pub async fn read_dir_structure(path: impl AsRef<Path>) -> WalkResult<TreeNode> {
    Walker::local().walk(path).await
}

/// State shared by every task of one walk
#[derive(Debug)]
struct Walk<B> {
    backend: Arc<B>,
    config: WalkConfig,
    cancelled: AtomicBool,
}

impl<B> Walk<B> {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Marks descents that stopped because another part of the walk failed
#[derive(Debug, thiserror::Error)]
#[error("walk cancelled after a failure elsewhere in the tree")]
struct Cancelled;

fn cancelled(path: &Path) -> WalkError {
    WalkError::io(path, io::Error::new(io::ErrorKind::Interrupted, Cancelled))
}

fn is_cancelled(err: &WalkError) -> bool {
    match err {
        WalkError::Io { source, .. } => source.get_ref().is_some_and(|e| e.is::<Cancelled>()),
        _ => false,
    }
}

async fn walk_root<B: FsBackend>(walk: Arc<Walk<B>>, path: PathBuf) -> WalkResult<TreeNode> {
    let kind = walk
        .backend
        .lstat(&path)
        .await
        .map_err(|e| WalkError::io(&path, e))?;
    if classify(kind) != Some(EntryType::Directory) {
        return Err(WalkError::NotADirectory { path });
    }

    read_tree(walk, path).await
}

// Boxed so the recursive future has a nameable type and can be spawned.
fn walk_listed<B: FsBackend>(
    walk: Arc<Walk<B>>,
    path: PathBuf,
) -> BoxFuture<'static, WalkResult<TreeNode>> {
    read_tree(walk, path).boxed()
}

/// Descents trust the parent's classification and are not stat'ed again. A
/// directory replaced since then fails with the listing's I/O error.
async fn read_tree<B: FsBackend>(walk: Arc<Walk<B>>, path: PathBuf) -> WalkResult<TreeNode> {
    if walk.is_cancelled() {
        return Err(cancelled(&path));
    }

    let names = walk
        .backend
        .list(&path)
        .await
        .map_err(|e| WalkError::io(&path, e))?;
    trace!(path = %path.display(), entries = names.len(), "listed directory");

    let entries = stat_children(&walk, &path, names).await?;
    let (dirs, others): (Vec<_>, Vec<_>) = entries.into_iter().partition(is_dir);

    let mut content: BTreeMap<String, TreeNode> = others
        .into_iter()
        .filter_map(|meta| {
            let node = classify(meta.kind).and_then(TreeNode::leaf)?;
            Some((meta.relative, node))
        })
        .collect();
    content.extend(walk_subdirs(&walk, &path, dirs).await?);

    Ok(TreeNode::Directory { content })
}

/// Fetch metadata for every child. All fetches settle before the first
/// failure, if any, is returned. Names that are not valid UTF-8 fail the walk
/// since they cannot be keys of the snapshot without colliding.
async fn stat_children<B: FsBackend>(
    walk: &Arc<Walk<B>>,
    dir: &Path,
    names: Vec<OsString>,
) -> WalkResult<Vec<EntryMeta>> {
    let results: Vec<WalkResult<EntryMeta>> = stream::iter(names)
        .map(|name| {
            let backend = Arc::clone(&walk.backend);
            let path = dir.join(&name);
            async move {
                let relative = name.into_string().map_err(|raw| {
                    let msg = format!("entry name is not valid UTF-8: {:?}", raw);
                    WalkError::io(&path, io::Error::new(io::ErrorKind::InvalidData, msg))
                })?;
                let kind = backend
                    .lstat(&path)
                    .await
                    .map_err(|e| WalkError::io(&path, e))?;
                Ok::<EntryMeta, WalkError>(EntryMeta {
                    path,
                    relative,
                    kind,
                })
            }
        })
        .buffer_unordered(walk.config.stat_concurrency.max(1))
        .collect()
        .await;

    results.into_iter().collect()
}

/// Walk every subdirectory on its own task. A failure cancels the rest of the
/// walk, but every task is still awaited before it is returned. A real
/// failure wins over the cancellations it caused.
async fn walk_subdirs<B: FsBackend>(
    walk: &Arc<Walk<B>>,
    parent: &Path,
    dirs: Vec<EntryMeta>,
) -> WalkResult<Vec<(String, TreeNode)>> {
    let mut tasks = JoinSet::new();
    for meta in dirs {
        let walk = Arc::clone(walk);
        tasks.spawn(async move {
            let node = walk_listed(walk, meta.path).await?;
            Ok::<_, WalkError>((meta.relative, node))
        });
    }

    let mut subtrees = Vec::with_capacity(tasks.len());
    let mut failure: Option<WalkError> = None;
    while let Some(joined) = tasks.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => {
                walk.cancel();
                std::panic::resume_unwind(e.into_panic())
            }
            Err(e) => Err(WalkError::io(
                parent,
                io::Error::new(io::ErrorKind::Interrupted, e),
            )),
        };
        match outcome {
            Ok(entry) => subtrees.push(entry),
            Err(err) => {
                walk.cancel();
                let replace = match &failure {
                    None => true,
                    Some(prev) => is_cancelled(prev) && !is_cancelled(&err),
                };
                if replace {
                    failure = Some(err);
                }
            }
        }
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(subtrees),
    }
}
