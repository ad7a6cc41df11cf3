//! Core MemFs implementation.

use std::collections::HashMap;
use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::backend::FsBackend;
use crate::types::EntryKind;

use super::node::Node;

/// Backend operation a fault can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Lstat,
    List,
}

#[derive(Debug, Default)]
struct State {
    nodes: HashMap<String, Node>,
    faults: HashMap<(Op, String), io::ErrorKind>,
}

/// In-memory filesystem backend
#[derive(Debug, Clone)]
pub struct MemFs {
    state: Arc<RwLock<State>>,
}

impl MemFs {
    /// Create a new in-memory filesystem with a root directory
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert("/".to_string(), Node::Dir);

        Self {
            state: Arc::new(RwLock::new(State {
                nodes,
                faults: HashMap::new(),
            })),
        }
    }

    fn read(&self) -> io::Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| io::Error::other("memfs state poisoned"))
    }

    fn write(&self) -> io::Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| io::Error::other("memfs state poisoned"))
    }

    /// Normalize and validate a path
    pub(super) fn normalize_path(path: &str) -> io::Result<String> {
        let invalid = |msg: &str| io::Error::new(io::ErrorKind::InvalidInput, msg.to_string());

        if path.is_empty() {
            return Err(invalid("empty path"));
        }

        let clean = path.trim_matches('/');
        if clean.is_empty() {
            return Ok("/".to_string());
        }

        let mut parts = Vec::new();
        for part in clean.split('/') {
            match part {
                "" => return Err(invalid("empty path component")),
                "." => {}
                ".." => return Err(invalid(".. traversal not allowed")),
                p => parts.push(p),
            }
        }

        if parts.is_empty() {
            return Ok("/".to_string());
        }
        Ok(format!("/{}", parts.join("/")))
    }

    fn normalize(path: &Path) -> io::Result<String> {
        let s = path.to_str().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "path is not valid UTF-8")
        })?;
        Self::normalize_path(s)
    }

    fn parent_of(path: &str) -> &str {
        path.rsplit_once('/')
            .map(|(p, _)| if p.is_empty() { "/" } else { p })
            .unwrap_or("/")
    }

    /// Get immediate children of a directory
    fn dir_children(dir_path: &str, nodes: &HashMap<String, Node>) -> Vec<String> {
        let prefix = if dir_path == "/" {
            "/".to_string()
        } else {
            format!("{}/", dir_path)
        };

        nodes
            .keys()
            .filter(|p| p.starts_with(&prefix) && p.as_str() != dir_path)
            .filter_map(|p| {
                let rest = &p[prefix.len()..];
                // Only immediate children (no nested paths)
                if rest.contains('/') {
                    None
                } else {
                    Some(rest.to_string())
                }
            })
            .collect()
    }

    /// Ensure parent directory exists
    fn ensure_parent_exists(path: &str, nodes: &HashMap<String, Node>) -> io::Result<()> {
        if path == "/" {
            return Ok(());
        }

        let parent = Self::parent_of(path);
        match nodes.get(parent) {
            Some(node) if node.is_dir() => Ok(()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("not a directory: {}", parent),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("parent directory: {}", parent),
            )),
        }
    }

    fn insert(&self, path: &str, node: Node) -> io::Result<()> {
        let path = Self::normalize_path(path)?;
        let mut state = self.write()?;

        if state.nodes.contains_key(&path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("already exists: {}", path),
            ));
        }
        Self::ensure_parent_exists(&path, &state.nodes)?;
        state.nodes.insert(path, node);
        Ok(())
    }

    pub fn create_dir(&self, path: &str) -> io::Result<()> {
        self.insert(path, Node::Dir)
    }

    /// Create a directory and any missing ancestors.
    pub fn create_dir_all(&self, path: &str) -> io::Result<()> {
        let path = Self::normalize_path(path)?;
        let mut state = self.write()?;

        let mut current = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current.push('/');
            current.push_str(part);
            match state.nodes.get(&current) {
                Some(node) if node.is_dir() => {}
                Some(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::NotADirectory,
                        format!("not a directory: {}", current),
                    ));
                }
                None => {
                    state.nodes.insert(current.clone(), Node::Dir);
                }
            }
        }
        Ok(())
    }

    pub fn create_file(&self, path: &str) -> io::Result<()> {
        self.insert(path, Node::File)
    }

    /// Create a symlink; the target does not need to exist.
    pub fn create_symlink(&self, path: &str, target: &str) -> io::Result<()> {
        self.insert(
            path,
            Node::Symlink {
                target: target.to_string(),
            },
        )
    }

    /// Create a node of a type the walker does not represent (FIFO, socket, device).
    pub fn create_special(&self, path: &str) -> io::Result<()> {
        self.insert(path, Node::Special)
    }

    /// Target of the symlink at `path`, if it is one.
    pub fn link_target(&self, path: &str) -> io::Result<Option<String>> {
        let path = Self::normalize_path(path)?;
        let state = self.read()?;
        Ok(match state.nodes.get(&path) {
            Some(Node::Symlink { target }) => Some(target.clone()),
            _ => None,
        })
    }

    /// Remove an entry. Directories must be empty.
    pub fn remove(&self, path: &str) -> io::Result<()> {
        let path = Self::normalize_path(path)?;

        if path == "/" {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot remove root",
            ));
        }

        let mut state = self.write()?;
        if let Some(node) = state.nodes.get(&path) {
            if node.is_dir() && !Self::dir_children(&path, &state.nodes).is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::DirectoryNotEmpty,
                    format!("directory not empty: {}", path),
                ));
            }
        }

        state
            .nodes
            .remove(&path)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path))
    }

    /// Make every future `op` on `path` fail with `kind`.
    pub fn inject_fault(&self, op: Op, path: &str, kind: io::ErrorKind) -> io::Result<()> {
        let path = Self::normalize_path(path)?;
        self.write()?.faults.insert((op, path), kind);
        Ok(())
    }

    pub fn fail_lstat(&self, path: &str, kind: io::ErrorKind) -> io::Result<()> {
        self.inject_fault(Op::Lstat, path, kind)
    }

    pub fn fail_list(&self, path: &str, kind: io::ErrorKind) -> io::Result<()> {
        self.inject_fault(Op::List, path, kind)
    }

    pub fn clear_faults(&self) -> io::Result<()> {
        self.write()?.faults.clear();
        Ok(())
    }

    fn check_fault(state: &State, op: Op, path: &str) -> io::Result<()> {
        match state.faults.get(&(op, path.to_string())) {
            Some(kind) => Err(io::Error::new(
                *kind,
                format!("injected {:?} failure: {}", op, path),
            )),
            None => Ok(()),
        }
    }
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FsBackend for MemFs {
    async fn lstat(&self, path: &Path) -> io::Result<EntryKind> {
        let path = Self::normalize(path)?;
        let state = self.read()?;
        Self::check_fault(&state, Op::Lstat, &path)?;

        state
            .nodes
            .get(&path)
            .map(Node::kind)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path))
    }

    async fn list(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let path = Self::normalize(path)?;
        let state = self.read()?;
        Self::check_fault(&state, Op::List, &path)?;

        match state.nodes.get(&path) {
            Some(Node::Dir) => Ok(Self::dir_children(&path, &state.nodes)
                .into_iter()
                .map(OsString::from)
                .collect()),
            Some(_) => Err(io::Error::new(io::ErrorKind::NotADirectory, path)),
            None => Err(io::Error::new(io::ErrorKind::NotFound, path)),
        }
    }
}
