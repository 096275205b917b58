//! Configuration types for stream backends
//!
//! All settings have defaults matching the plain `*_open` constructors, so a
//! host only builds one of these when it wants to deviate from them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default size of the line framing accumulator
pub const DEFAULT_LINE_CAPACITY: usize = 1024;

/// Default size of the copy transfer buffer
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 1024;

/// Line framing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Accumulator size; a record plus its unterminated tail must fit
    pub capacity: usize,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_LINE_CAPACITY,
        }
    }
}

impl LineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the accumulator capacity
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Child process configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// How long a child gets to exit after SIGTERM before it is killed
    pub grace_period: Duration,
    /// How often the child is checked for exit during the grace period
    pub poll_interval: Duration,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(2),
            poll_interval: Duration::from_millis(20),
        }
    }
}

impl ProcessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the SIGTERM grace period
    pub fn grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Set the exit polling interval used during the grace period
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// TCP client configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    /// Disable Nagle's algorithm on the connected socket
    pub nodelay: bool,
}

impl TcpConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}

/// Stream copy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyConfig {
    pub buffer_size: usize,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_COPY_BUFFER_SIZE,
        }
    }
}

impl CopyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }
}

/// Pseudo-random source configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomConfig {
    /// Total number of bytes produced before the stream finishes; `None` is unlimited
    pub max_len: Option<usize>,
    /// Fixed seed for reproducible output; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl RandomConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
