//! Uniform blocking byte streams.
//!
//! Memory buffers, files, bounded pipes, pseudo-terminal child processes,
//! TCP sockets and a pseudo-random source all sit behind one [`Stream`]
//! handle offering `read`, `write`, `available` and `close`, plus a single
//! readiness listener. The [`line`] decorator re-frames any readable stream
//! into records and [`copy`] drains one stream into another.

pub mod backends;
pub mod error;
pub mod line;
pub mod stream;
pub mod stream_configuration;
pub mod stream_performance_metrics;

pub use backends::{
    file_open, mem_open, pipe_open, process_open, process_open_with, rand_open, rand_open_with,
    tcp_open, tcp_open_with, MemoryBuffer,
};
pub use error::{StreamError, StreamResult};
pub use line::{line_open, line_open_with};
pub use stream::{copy, copy_with, Available, Backend, OpenMode, Readiness, Stream, Transfer};
pub use stream_configuration::{CopyConfig, LineConfig, ProcessConfig, RandomConfig, TcpConfig};
pub use stream_performance_metrics::StreamMetrics;
