//! Core stream handle and the backend capability trait.
//!
//! Callers only ever see [`Stream`]. Each backend plugs in through
//! [`Backend`], implementing the subset of operations it supports; the
//! handle takes care of capability checks, closed-handle errors, metrics
//! and firing the readiness listener.

use super::notify::{NotifyFn, NotifySlot, Readiness};
use crate::error::{StreamError, StreamResult};
use crate::stream_performance_metrics::{MetricsRecorder, StreamMetrics};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, Weak};

/// Direction of a completed transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    Read,
    Write,
}

/// Non-blocking readiness hint returned by [`Stream::available`].
///
/// `read`/`write` are byte counts where the backend knows them and a
/// non-zero indicator where it only knows that *some* data or space exists.
/// `finished` means no more data or space will ever appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Available {
    pub read: usize,
    pub write: usize,
    pub finished: bool,
}

impl Available {
    /// Best-effort answer for backends without native readiness support
    pub fn always(read: bool, write: bool) -> Self {
        Self {
            read: read as usize,
            write: write as usize,
            finished: false,
        }
    }

    pub fn is_readable(&self) -> bool {
        self.read > 0
    }

    pub fn is_writable(&self) -> bool {
        self.write > 0
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// A concrete byte source or sink.
///
/// Every method has a default so a backend only implements what it offers.
/// Methods take `&self`: a backend synchronises its own state, which lets a
/// blocking read on one thread coexist with a write on another.
pub trait Backend: Send + Sync {
    /// Short label used in logs and `Debug` output
    fn kind(&self) -> &'static str;

    fn can_read(&self) -> bool {
        false
    }

    fn can_write(&self) -> bool {
        false
    }

    fn read(&self, _dst: &mut [u8]) -> StreamResult<usize> {
        Err(StreamError::Unsupported("read"))
    }

    fn write(&self, _src: &[u8]) -> StreamResult<usize> {
        Err(StreamError::Unsupported("write"))
    }

    fn available(&self) -> StreamResult<Available> {
        Ok(Available::always(self.can_read(), self.can_write()))
    }

    /// Decide whether a completed transfer should reach the listener. Only
    /// called when a listener is installed; descriptor backends block here
    /// until their descriptor is ready again.
    fn should_notify(&self, _transfer: Transfer, _moved: usize) -> StreamResult<bool> {
        Ok(true)
    }

    /// Release the backend's resources
    fn close(self: Box<Self>) -> StreamResult<()> {
        Ok(())
    }
}

struct StreamInner {
    kind: &'static str,
    backend: RwLock<Option<Box<dyn Backend>>>,
    notify: NotifySlot,
    metrics: MetricsRecorder,
}

impl StreamInner {
    fn fire(&self) {
        if self.notify.fire() {
            self.metrics.record_notification();
            log::trace!("{} stream notified its listener", self.kind);
        }
    }
}

/// Handle to an open byte stream.
///
/// Cloning the handle is cheap and every clone addresses the same backend,
/// listener and metrics. Once any clone has been closed, every operation on
/// the others fails with [`StreamError::InvalidArgument`].
#[derive(Clone)]
pub struct Stream {
    inner: Arc<StreamInner>,
}

impl Stream {
    /// Wrap a backend in a new handle
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: Backend + 'static,
    {
        let kind = backend.kind();
        Self {
            inner: Arc::new(StreamInner {
                kind,
                backend: RwLock::new(Some(Box::new(backend))),
                notify: NotifySlot::new(),
                metrics: MetricsRecorder::new(),
            }),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.inner.kind
    }

    fn backend(&self) -> StreamResult<RwLockReadGuard<'_, Option<Box<dyn Backend>>>> {
        let guard = self
            .inner
            .backend
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            return Err(StreamError::closed());
        }
        Ok(guard)
    }

    fn transfer<F>(&self, direction: Transfer, len: usize, op: F) -> StreamResult<usize>
    where
        F: FnOnce(&dyn Backend) -> StreamResult<usize>,
    {
        let (moved, notify) = {
            let guard = self.backend()?;
            let backend = guard.as_deref().ok_or_else(StreamError::closed)?;
            let supported = match direction {
                Transfer::Read => backend.can_read(),
                Transfer::Write => backend.can_write(),
            };
            if !supported {
                return Err(StreamError::Unsupported(match direction {
                    Transfer::Read => "read",
                    Transfer::Write => "write",
                }));
            }

            // Empty requests never reach the backend, but they still count as
            // a transfer for the listener.
            let moved = if len == 0 {
                0
            } else {
                let moved = match op(backend) {
                    Ok(moved) => moved,
                    Err(err) => {
                        self.inner.metrics.record_error();
                        return Err(err);
                    }
                };
                match direction {
                    Transfer::Read => self.inner.metrics.record_read(moved),
                    Transfer::Write => self.inner.metrics.record_write(moved),
                }
                moved
            };

            let notify = if self.inner.notify.is_set() {
                backend.should_notify(direction, moved)?
            } else {
                false
            };
            (moved, notify)
        };

        if notify {
            self.inner.fire();
        }
        Ok(moved)
    }

    /// Read at most `dst.len()` bytes. `Ok(0)` means no data is currently
    /// producible; whether that is final depends on the backend.
    pub fn read(&self, dst: &mut [u8]) -> StreamResult<usize> {
        let len = dst.len();
        self.transfer(Transfer::Read, len, |backend| backend.read(dst))
    }

    /// Write at most `src.len()` bytes. Short writes are normal and the
    /// caller must loop on the remainder.
    pub fn write(&self, src: &[u8]) -> StreamResult<usize> {
        self.transfer(Transfer::Write, src.len(), |backend| backend.write(src))
    }

    /// Report how much can be read or written without blocking
    pub fn available(&self) -> StreamResult<Available> {
        let guard = self.backend()?;
        let backend = guard.as_deref().ok_or_else(StreamError::closed)?;
        backend.available()
    }

    /// Close the stream, releasing its backend exactly once. The backend is
    /// released even when its close hook reports an error.
    pub fn close(self) -> StreamResult<()> {
        let backend = self
            .inner
            .backend
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(StreamError::closed)?;
        self.inner.notify.replace(None);

        let metrics = self.inner.metrics.snapshot();
        log::debug!(
            "closing {} stream ({} bytes read, {} bytes written)",
            self.inner.kind,
            metrics.bytes_read,
            metrics.bytes_written
        );
        backend.close().map_err(|err| {
            log::error!("failed to close {} stream: {}", self.inner.kind, err);
            err
        })
    }

    /// Whether the stream is open and its backend supports reading
    pub fn can_read(&self) -> bool {
        self.backend()
            .map(|guard| guard.as_deref().map_or(false, |backend| backend.can_read()))
            .unwrap_or(false)
    }

    /// Whether the stream is open and its backend supports writing
    pub fn can_write(&self) -> bool {
        self.backend()
            .map(|guard| guard.as_deref().map_or(false, |backend| backend.can_write()))
            .unwrap_or(false)
    }

    pub fn is_closed(&self) -> bool {
        self.inner
            .backend
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Install `listener` as the stream's only subscriber, replacing any
    /// previous one.
    pub fn set_notify<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.notify.replace(Some(Arc::new(listener)));
    }

    /// Install or clear the subscriber, returning the previous one
    pub fn replace_notify(&self, listener: Option<NotifyFn>) -> Option<NotifyFn> {
        self.inner.notify.replace(listener)
    }

    pub fn clear_notify(&self) {
        self.inner.notify.replace(None);
    }

    pub fn has_notify(&self) -> bool {
        self.inner.notify.is_set()
    }

    /// Install a fresh [`Readiness`] event as the stream's subscriber and
    /// return it, so a thread can block until the stream reports progress.
    pub fn subscribe(&self) -> Arc<Readiness> {
        let event = Readiness::new();
        let signal = event.clone();
        self.set_notify(move || signal.signal());
        event
    }

    pub fn metrics(&self) -> StreamMetrics {
        self.inner.metrics.snapshot()
    }

    pub(crate) fn downgrade(&self) -> WeakStream {
        WeakStream {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("kind", &self.inner.kind)
            .field("closed", &self.is_closed())
            .field("notify", &self.inner.notify)
            .finish()
    }
}

/// Non-owning reference used to chain notifications from a wrapped stream
/// to its decorator without keeping the decorator alive.
#[derive(Clone)]
pub(crate) struct WeakStream {
    inner: Weak<StreamInner>,
}

impl WeakStream {
    pub(crate) fn notify(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.fire();
        }
    }
}
