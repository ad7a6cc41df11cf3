//! Core types: entry tags, metadata records and the tree snapshot.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The closed set of entry types that appear in a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    Directory,
    File,
    SymbolicLink,
}

/// Raw type tag reported by a metadata fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Directory,
    File,
    SymbolicLink,
    /// Block/char devices, sockets, FIFOs
    Other,
}

impl EntryKind {
    /// Checks are applied in the order directory, file, symlink.
    pub fn from_file_type(ft: std::fs::FileType) -> Self {
        if ft.is_dir() {
            EntryKind::Directory
        } else if ft.is_file() {
            EntryKind::File
        } else if ft.is_symlink() {
            EntryKind::SymbolicLink
        } else {
            EntryKind::Other
        }
    }
}

/// Metadata record for one child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMeta {
    /// Parent path joined with `relative`
    pub path: PathBuf,
    pub relative: String,
    pub kind: EntryKind,
}

/// One node of a directory snapshot.
///
/// Serializes as `{"type": "Directory", "content": {...}}` for directories and
/// `{"type": "File"}` / `{"type": "SymbolicLink"}` for everything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TreeNode {
    Directory { content: BTreeMap<String, TreeNode> },
    File,
    SymbolicLink,
}

impl TreeNode {
    pub fn empty_dir() -> Self {
        TreeNode::Directory {
            content: BTreeMap::new(),
        }
    }

    /// Leaf node for a non-directory entry type.
    pub fn leaf(ty: EntryType) -> Option<Self> {
        match ty {
            EntryType::File => Some(TreeNode::File),
            EntryType::SymbolicLink => Some(TreeNode::SymbolicLink),
            EntryType::Directory => None,
        }
    }

    pub fn entry_type(&self) -> EntryType {
        match self {
            TreeNode::Directory { .. } => EntryType::Directory,
            TreeNode::File => EntryType::File,
            TreeNode::SymbolicLink => EntryType::SymbolicLink,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, TreeNode::Directory { .. })
    }

    /// Children of a directory node, `None` for leaves
    pub fn content(&self) -> Option<&BTreeMap<String, TreeNode>> {
        match self {
            TreeNode::Directory { content } => Some(content),
            _ => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&TreeNode> {
        self.content()?.get(name)
    }

    /// Follow a sequence of child names down from this node.
    pub fn get_path<S: AsRef<str>>(&self, names: &[S]) -> Option<&TreeNode> {
        names
            .iter()
            .try_fold(self, |node, name| node.get(name.as_ref()))
    }

    /// Number of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self
            .content()
            .map(|c| c.values().map(TreeNode::node_count).sum::<usize>())
            .unwrap_or(0)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> TreeNode {
        let mut subdir = BTreeMap::new();
        subdir.insert("data-ln.txt".to_string(), TreeNode::SymbolicLink);
        let mut root = BTreeMap::new();
        root.insert("data.txt".to_string(), TreeNode::File);
        root.insert(
            "subdir".to_string(),
            TreeNode::Directory { content: subdir },
        );
        TreeNode::Directory { content: root }
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "Directory",
                "content": {
                    "data.txt": { "type": "File" },
                    "subdir": {
                        "type": "Directory",
                        "content": {
                            "data-ln.txt": { "type": "SymbolicLink" }
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn test_leaves_have_no_content_key() {
        let value = serde_json::to_value(TreeNode::File).unwrap();
        assert_eq!(value, json!({ "type": "File" }));
        assert!(value.get("content").is_none());
    }

    #[test]
    fn test_from_json() {
        let text = r#"{"type":"Directory","content":{"a":{"type":"SymbolicLink"}}}"#;
        let node = TreeNode::from_json(text).unwrap();
        assert_eq!(node.get("a"), Some(&TreeNode::SymbolicLink));
        assert!(TreeNode::from_json(r#"{"type":"Socket"}"#).is_err());
    }

    #[test]
    fn test_lookup_helpers() {
        let tree = sample();
        assert_eq!(tree.node_count(), 4);
        assert_eq!(
            tree.get_path(&["subdir", "data-ln.txt"]),
            Some(&TreeNode::SymbolicLink)
        );
        assert!(tree.get_path(&["data.txt", "nested"]).is_none());
        assert_eq!(tree.get("subdir").map(TreeNode::entry_type), Some(EntryType::Directory));
        assert!(TreeNode::File.content().is_none());
    }

    #[test]
    fn test_leaf() {
        assert_eq!(TreeNode::leaf(EntryType::File), Some(TreeNode::File));
        assert_eq!(TreeNode::leaf(EntryType::Directory), None);
    }
}
