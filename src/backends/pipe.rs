//! Bounded in-memory pipe for producer/consumer handoff

use crate::error::{StreamError, StreamResult};
use crate::stream::{Available, Backend, Stream};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

struct PipeBackend {
    capacity: usize,
    buffer: Mutex<VecDeque<u8>>,
}

impl PipeBackend {
    fn buffer(&self) -> std::sync::MutexGuard<'_, VecDeque<u8>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Backend for PipeBackend {
    fn kind(&self) -> &'static str {
        "pipe"
    }

    fn can_read(&self) -> bool {
        true
    }

    fn can_write(&self) -> bool {
        true
    }

    /// Takes up to `dst.len()` bytes from the front of the pipe.
    fn read(&self, dst: &mut [u8]) -> StreamResult<usize> {
        let mut buffer = self.buffer();
        let size = dst.len().min(buffer.len());
        for (slot, byte) in dst.iter_mut().zip(buffer.drain(..size)) {
            *slot = byte;
        }
        Ok(size)
    }

    /// Accepts only what fits; a full pipe accepts nothing.
    fn write(&self, src: &[u8]) -> StreamResult<usize> {
        let mut buffer = self.buffer();
        let size = src.len().min(self.capacity - buffer.len());
        buffer.extend(&src[..size]);
        Ok(size)
    }

    /// A pipe never finishes on its own.
    fn available(&self) -> StreamResult<Available> {
        let used = self.buffer().len();
        Ok(Available {
            read: (used > 0) as usize,
            write: (used < self.capacity) as usize,
            finished: false,
        })
    }
}

/// Open a pipe holding at most `capacity` bytes. Every read and write fires
/// the listener, whether or not bytes moved.
pub fn pipe_open(capacity: usize) -> StreamResult<Stream> {
    if capacity == 0 {
        return Err(StreamError::InvalidArgument(
            "pipe capacity must be non-zero".to_string(),
        ));
    }
    let mut buffer = VecDeque::new();
    buffer.try_reserve_exact(capacity)?;
    log::debug!("opening pipe stream with capacity {}", capacity);
    Ok(Stream::from_backend(PipeBackend {
        capacity,
        buffer: Mutex::new(buffer),
    }))
}
