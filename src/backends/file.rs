//! Local file backend

use crate::error::{StreamError, StreamResult};
use crate::stream::{fd, Available, Backend, OpenMode, Stream, Transfer};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsFd;
use std::path::Path;

struct FileBackend {
    file: File,
    mode: OpenMode,
}

impl Backend for FileBackend {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn can_read(&self) -> bool {
        self.mode.read
    }

    fn can_write(&self) -> bool {
        self.mode.write
    }

    /// Fills `dst` until it is full or the file ends.
    fn read(&self, dst: &mut [u8]) -> StreamResult<usize> {
        let mut file = &self.file;
        let mut filled = 0;
        while filled < dst.len() {
            match file.read(&mut dst[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(filled)
    }

    fn write(&self, src: &[u8]) -> StreamResult<usize> {
        let mut file = &self.file;
        let mut written = 0;
        while written < src.len() {
            match file.write(&src[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(written)
    }

    fn available(&self) -> StreamResult<Available> {
        Err(StreamError::Unsupported("available"))
    }

    fn should_notify(&self, _transfer: Transfer, _moved: usize) -> StreamResult<bool> {
        fd::wait_ready(self.file.as_fd())
    }
}

/// Open a file on the local filesystem as a stream.
///
/// `"r"` opens an existing file read-only, `"w"` creates or truncates it,
/// `"rw"` creates it without truncating and `"a"` appends.
pub fn file_open<P: AsRef<Path>>(path: P, mode: &str) -> StreamResult<Stream> {
    let path = path.as_ref();
    let mode: OpenMode = mode.parse()?;

    let mut options = OpenOptions::new();
    options.read(mode.read);
    if mode.append {
        options.append(true).create(true);
    } else if mode.write {
        options.write(true).create(true).truncate(!mode.read);
    }

    let file = options.open(path).map_err(|err| {
        log::warn!("failed to open {} ({}): {}", path.display(), mode, err);
        StreamError::from(err)
    })?;
    log::debug!("opened file stream {} ({})", path.display(), mode);
    Ok(Stream::from_backend(FileBackend { file, mode }))
}
