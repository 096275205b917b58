//! Pseudo-random byte source

use crate::error::StreamResult;
use crate::stream::{Available, Backend, Stream};
use crate::stream_configuration::RandomConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

struct RandomState {
    rng: StdRng,
    produced: usize,
}

struct RandomBackend {
    max_len: Option<usize>,
    state: Mutex<RandomState>,
}

impl RandomBackend {
    fn remaining(&self, produced: usize) -> usize {
        match self.max_len {
            Some(max_len) => max_len.saturating_sub(produced),
            None => usize::MAX,
        }
    }
}

impl Backend for RandomBackend {
    fn kind(&self) -> &'static str {
        "random"
    }

    fn can_read(&self) -> bool {
        true
    }

    fn read(&self, dst: &mut [u8]) -> StreamResult<usize> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let size = dst.len().min(self.remaining(state.produced));
        // One draw per byte: `fill_bytes` discards the unused tail of its last
        // word, which would make seeded output depend on the read sizes.
        for byte in &mut dst[..size] {
            *byte = state.rng.gen();
        }
        state.produced += size;
        Ok(size)
    }

    fn available(&self) -> StreamResult<Available> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let remaining = self.remaining(state.produced);
        Ok(Available {
            read: remaining,
            write: 0,
            finished: remaining == 0,
        })
    }
}

/// Open a read-only stream of pseudo-random bytes, finishing after
/// `max_len` bytes or never when `None`.
pub fn rand_open(max_len: Option<usize>) -> StreamResult<Stream> {
    rand_open_with(&RandomConfig {
        max_len,
        seed: None,
    })
}

pub fn rand_open_with(config: &RandomConfig) -> StreamResult<Stream> {
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    log::debug!("opening random stream (max_len: {:?})", config.max_len);
    Ok(Stream::from_backend(RandomBackend {
        max_len: config.max_len,
        state: Mutex::new(RandomState { rng, produced: 0 }),
    }))
}
