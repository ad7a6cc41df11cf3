//! In-memory backend with injectable failures.

mod fs;
mod node;


pub use fs::{MemFs, Op};
