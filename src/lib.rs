//! dirshape: recursive, non-following snapshots of a directory tree's structure.

pub mod backend;
pub mod backends;
pub mod classify;
pub mod error;
pub mod types;
pub mod walker;

// Re-export
pub use backend::*;
pub use backends::{MemFs, TokioFs};
pub use classify::classify;
pub use error::{WalkError, WalkResult};
pub use types::*;
pub use walker::{read_dir_structure, WalkConfig, Walker};
