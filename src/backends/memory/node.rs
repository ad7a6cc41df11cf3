//! Internal node representation for the in-memory filesystem.

use crate::types::EntryKind;

/// Internal filesystem node
#[derive(Debug, Clone)]
pub(super) enum Node {
    File,
    Dir,
    /// Target is stored, never resolved
    Symlink { target: String },
    /// Stand-in for devices, sockets and FIFOs
    Special,
}

impl Node {
    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Dir)
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Node::File => EntryKind::File,
            Node::Dir => EntryKind::Directory,
            Node::Symlink { .. } => EntryKind::SymbolicLink,
            Node::Special => EntryKind::Other,
        }
    }
}
