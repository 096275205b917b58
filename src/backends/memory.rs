//! Memory backend: a cursor over a fixed, caller-supplied buffer

use crate::error::StreamResult;
use crate::stream::{Available, Backend, OpenMode, Stream, Transfer};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Fixed-length byte region shared between the caller and a memory stream.
///
/// The caller keeps a clone to seed the region before reading or to inspect
/// it after writing. Streams never grow or shrink it.
#[derive(Clone, Default)]
pub struct MemoryBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl MemoryBuffer {
    /// A zero-filled buffer of `len` bytes
    pub fn zeroed(len: usize) -> Self {
        Self::from(vec![0u8; len])
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.lock().clone()
    }

    /// Run `f` over the current contents without copying them
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<u8>> {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<Vec<u8>> for MemoryBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Arc::new(Mutex::new(bytes)),
        }
    }
}

impl From<&[u8]> for MemoryBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self::from(bytes.to_vec())
    }
}

impl fmt::Debug for MemoryBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBuffer").field("len", &self.len()).finish()
    }
}

struct MemoryBackend {
    buffer: MemoryBuffer,
    pos: Mutex<usize>,
    mode: OpenMode,
}

impl MemoryBackend {
    fn cursor(&self) -> std::sync::MutexGuard<'_, usize> {
        self.pos.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Backend for MemoryBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn can_read(&self) -> bool {
        self.mode.read
    }

    fn can_write(&self) -> bool {
        self.mode.write
    }

    fn read(&self, dst: &mut [u8]) -> StreamResult<usize> {
        let mut pos = self.cursor();
        let bytes = self.buffer.lock();
        let size = dst.len().min(bytes.len().saturating_sub(*pos));
        dst[..size].copy_from_slice(&bytes[*pos..*pos + size]);
        *pos += size;
        Ok(size)
    }

    fn write(&self, src: &[u8]) -> StreamResult<usize> {
        let mut pos = self.cursor();
        let mut bytes = self.buffer.lock();
        let size = src.len().min(bytes.len().saturating_sub(*pos));
        bytes[*pos..*pos + size].copy_from_slice(&src[..size]);
        *pos += size;
        Ok(size)
    }

    fn available(&self) -> StreamResult<Available> {
        let remaining = self.buffer.len().saturating_sub(*self.cursor());
        Ok(Available {
            read: if self.mode.read { remaining } else { 0 },
            write: if self.mode.write { remaining } else { 0 },
            finished: remaining == 0,
        })
    }

    fn should_notify(&self, _transfer: Transfer, _moved: usize) -> StreamResult<bool> {
        Ok(*self.cursor() < self.buffer.len())
    }
}

/// Open a stream over `buffer`. `mode` selects read, write or both; the
/// cursor is shared by both directions and never wraps.
pub fn mem_open(buffer: MemoryBuffer, mode: &str) -> StreamResult<Stream> {
    let mode: OpenMode = mode.parse()?;
    log::debug!("opening memory stream over {} bytes ({})", buffer.len(), mode);
    Ok(Stream::from_backend(MemoryBackend {
        buffer,
        pos: Mutex::new(0),
        mode,
    }))
}
