//! Line framing decorator
//!
//! Wraps a readable stream and hands its bytes out one record at a time.
//! Records end at `\r`, `\n` or a NUL byte; `\r\n` counts as a single
//! delimiter even when the two bytes arrive in separate reads.
//!
//! Opening a line stream installs it as the parent's only listener, so any
//! listener the caller had on the parent is replaced. Closing the line
//! stream clears the parent's listener but leaves the parent open.

use crate::error::{StreamError, StreamResult};
use crate::stream::{Available, Backend, Stream};
use crate::stream_configuration::LineConfig;
use std::sync::{Mutex, MutexGuard, PoisonError};

fn is_delimiter(byte: u8) -> bool {
    matches!(byte, b'\r' | b'\n' | b'\0')
}

#[derive(Debug, Default)]
struct LineState {
    buffer: Vec<u8>,
    /// End of the first complete record in `buffer`. Equal to
    /// `buffer.len()` when the parent ended without a final delimiter.
    boundary: Option<usize>,
    /// The last record ended in a `\r` with nothing after it yet
    skip_lf: bool,
}

impl LineState {
    fn rescan(&mut self) {
        self.boundary = self.buffer.iter().position(|&b| is_delimiter(b));
    }

    fn append(&mut self, mut chunk: &[u8]) {
        if self.skip_lf && !chunk.is_empty() {
            if chunk[0] == b'\n' {
                chunk = &chunk[1..];
            }
            self.skip_lf = false;
        }
        self.buffer.extend_from_slice(chunk);
        self.rescan();
    }

    /// Copy the first record into `dst`, NUL-terminated and truncated to
    /// leave room for the terminator, then drop it and its delimiter.
    fn take_record(&mut self, boundary: usize, dst: &mut [u8]) -> usize {
        let len = boundary.min(dst.len().saturating_sub(1));
        dst[..len].copy_from_slice(&self.buffer[..len]);
        if let Some(terminator) = dst.get_mut(len) {
            *terminator = 0;
        }

        let mut consumed = (boundary + 1).min(self.buffer.len());
        if self.buffer.get(boundary) == Some(&b'\r') {
            match self.buffer.get(boundary + 1) {
                Some(b'\n') => consumed += 1,
                Some(_) => {}
                None => self.skip_lf = true,
            }
        }
        self.buffer.drain(..consumed);
        self.rescan();
        len
    }
}

struct LineBackend {
    parent: Stream,
    capacity: usize,
    state: Mutex<LineState>,
}

impl LineBackend {
    fn state(&self) -> MutexGuard<'_, LineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn parent_finished(&self) -> StreamResult<bool> {
        match self.parent.available() {
            Ok(available) => Ok(available.finished),
            Err(StreamError::Unsupported(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Pull one chunk from the parent into the accumulator. The state lock
    /// is not held across the parent read: the parent may block, and its
    /// listener calls back into this stream.
    fn fill(&self) -> StreamResult<()> {
        let free = self.capacity.saturating_sub(self.state().buffer.len());
        if free == 0 {
            return Err(StreamError::RecordTooLong {
                capacity: self.capacity,
            });
        }

        let mut chunk = vec![0u8; free];
        let n = self.parent.read(&mut chunk)?;
        let ended = n == 0 && self.parent_finished()?;

        let mut state = self.state();
        state.append(&chunk[..n]);
        if ended && state.boundary.is_none() && !state.buffer.is_empty() {
            state.boundary = Some(state.buffer.len());
        }
        Ok(())
    }
}

impl Backend for LineBackend {
    fn kind(&self) -> &'static str {
        "line"
    }

    fn can_read(&self) -> bool {
        true
    }

    /// Returns the length of the next record, or 0 when no complete record
    /// is known yet. Blank records also have length 0.
    fn read(&self, dst: &mut [u8]) -> StreamResult<usize> {
        if self.state().boundary.is_none() {
            self.fill()?;
        }

        let mut state = self.state();
        match state.boundary {
            Some(boundary) => Ok(state.take_record(boundary, dst)),
            None => Ok(0),
        }
    }

    fn available(&self) -> StreamResult<Available> {
        let (ready, buffered) = {
            let state = self.state();
            (state.boundary.is_some(), !state.buffer.is_empty())
        };
        let finished = !buffered && self.parent_finished()?;
        Ok(Available {
            read: ready as usize,
            write: 0,
            finished,
        })
    }

    fn close(self: Box<Self>) -> StreamResult<()> {
        self.parent.clear_notify();
        Ok(())
    }
}

/// Wrap `parent` in a line framing stream with a 1024-byte accumulator
pub fn line_open(parent: &Stream) -> StreamResult<Stream> {
    line_open_with(parent, &LineConfig::default())
}

pub fn line_open_with(parent: &Stream, config: &LineConfig) -> StreamResult<Stream> {
    if parent.is_closed() {
        return Err(StreamError::closed());
    }
    if !parent.can_read() {
        return Err(StreamError::Unsupported("read"));
    }
    if config.capacity == 0 {
        return Err(StreamError::InvalidArgument(
            "line buffer capacity must be non-zero".to_string(),
        ));
    }

    let mut buffer = Vec::new();
    buffer.try_reserve_exact(config.capacity)?;
    let line = Stream::from_backend(LineBackend {
        parent: parent.clone(),
        capacity: config.capacity,
        state: Mutex::new(LineState {
            buffer,
            ..LineState::default()
        }),
    });

    if parent.has_notify() {
        log::debug!("line stream replaces the existing {} stream listener", parent.kind());
    }
    let chained = line.downgrade();
    parent.set_notify(move || chained.notify());

    log::debug!(
        "opened line stream over {} stream ({} byte buffer)",
        parent.kind(),
        config.capacity
    );
    Ok(line)
}
