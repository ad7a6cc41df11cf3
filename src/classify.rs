//! Entry classification.

use crate::types::{EntryKind, EntryMeta, EntryType};

/// Map a raw kind onto the snapshot's tag set. `None` means the entry is not
/// representable and is left out of the tree.
pub fn classify(kind: EntryKind) -> Option<EntryType> {
    match kind {
        EntryKind::Directory => Some(EntryType::Directory),
        EntryKind::File => Some(EntryType::File),
        EntryKind::SymbolicLink => Some(EntryType::SymbolicLink),
        EntryKind::Other => None,
    }
}

pub fn is_dir(meta: &EntryMeta) -> bool {
    classify(meta.kind) == Some(EntryType::Directory)
}
