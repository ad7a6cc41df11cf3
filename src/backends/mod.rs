pub mod memory;
pub mod tokio_fs;

pub use memory::{MemFs, Op};
pub use tokio_fs::TokioFs;
