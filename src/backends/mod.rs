//! Concrete stream backends
//!
//! Each backend exposes exactly one way to open it; past that point callers
//! only see [`Stream`](crate::stream::Stream).

pub mod file;
pub mod memory;
pub mod pipe;
pub mod process;
pub mod random;
pub mod tcp;

pub use file::file_open;
pub use memory::{mem_open, MemoryBuffer};
pub use pipe::pipe_open;
pub use process::{process_open, process_open_with};
pub use random::{rand_open, rand_open_with};
pub use tcp::{tcp_open, tcp_open_with};
