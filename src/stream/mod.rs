//! The uniform byte-stream contract
//!
//! A [`Stream`] exposes read, write, available and close over any backend,
//! plus a single readiness listener. Backends implement [`Backend`].

pub mod core;
pub(crate) mod fd;
pub mod mode;
pub mod notify;
pub mod utility;

pub use self::core::{Available, Backend, Stream, Transfer};
pub use mode::OpenMode;
pub use notify::{NotifyFn, Readiness};
pub use utility::{copy, copy_with};
