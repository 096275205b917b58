//! Stream utilities built purely on the generic read/write contract

use super::core::Stream;
use crate::error::{StreamError, StreamResult};
use crate::stream_configuration::CopyConfig;

/// Drain `input` into `output` with a 1024-byte transfer buffer.
///
/// Stops when `input` returns 0 or `output` accepts nothing. Returns the
/// number of bytes written to `output`, including a final partial chunk.
/// Any error from either side aborts the copy immediately.
pub fn copy(input: &Stream, output: &Stream) -> StreamResult<usize> {
    copy_with(input, output, &CopyConfig::default())
}

pub fn copy_with(input: &Stream, output: &Stream, config: &CopyConfig) -> StreamResult<usize> {
    if config.buffer_size == 0 {
        return Err(StreamError::InvalidArgument(
            "copy buffer size must be non-zero".to_string(),
        ));
    }

    let mut buffer = vec![0u8; config.buffer_size];
    let mut copied = 0;
    loop {
        let read = input.read(&mut buffer)?;
        if read == 0 {
            break;
        }

        let mut written = 0;
        while written < read {
            let n = output.write(&buffer[written..read])?;
            if n == 0 {
                copied += written;
                log::debug!(
                    "{} stream refused more data after {} bytes",
                    output.kind(),
                    copied
                );
                return Ok(copied);
            }
            written += n;
        }
        copied += written;
    }

    log::debug!(
        "copied {} bytes from {} stream to {} stream",
        copied,
        input.kind(),
        output.kind()
    );
    Ok(copied)
}
