//! Transfer metrics for byte streams
//!
//! Every stream handle carries a set of atomic counters shared by all of its
//! clones. [`StreamMetrics`] is a point-in-time copy of them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live counters owned by a stream handle
#[derive(Debug)]
pub(crate) struct MetricsRecorder {
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    reads: AtomicU64,
    writes: AtomicU64,
    errors: AtomicU64,
    notifications: AtomicU64,
    opened_at: Instant,
}

impl MetricsRecorder {
    pub(crate) fn new() -> Self {
        Self {
            bytes_read: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            notifications: AtomicU64::new(0),
            opened_at: Instant::now(),
        }
    }

    pub(crate) fn record_read(&self, bytes: usize) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self, bytes: usize) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_notification(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StreamMetrics {
        StreamMetrics {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
            elapsed: self.opened_at.elapsed(),
        }
    }
}

/// Metrics collected for a stream since it was opened
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamMetrics {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub reads: u64,
    pub writes: u64,
    pub errors: u64,
    pub notifications: u64,
    pub elapsed: Duration,
}

impl StreamMetrics {
    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_read + self.bytes_written
    }

    pub fn read_throughput_bytes_per_sec(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.bytes_read as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn write_throughput_bytes_per_sec(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.bytes_written as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}
