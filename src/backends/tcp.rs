//! TCP client backend

use crate::error::{StreamError, StreamResult};
use crate::stream::{fd, Available, Backend, Stream, Transfer};
use crate::stream_configuration::TcpConfig;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::os::fd::AsFd;

struct TcpBackend {
    socket: TcpStream,
}

impl Backend for TcpBackend {
    fn kind(&self) -> &'static str {
        "tcp"
    }

    fn can_read(&self) -> bool {
        true
    }

    fn can_write(&self) -> bool {
        true
    }

    fn read(&self, dst: &mut [u8]) -> StreamResult<usize> {
        let mut socket = &self.socket;
        loop {
            match socket.read(dst) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn write(&self, src: &[u8]) -> StreamResult<usize> {
        let mut socket = &self.socket;
        loop {
            match socket.write(src) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Zero-timeout poll of the socket. A readable socket with nothing
    /// queued means the peer has closed its side.
    fn available(&self) -> StreamResult<Available> {
        let state = fd::probe(self.socket.as_fd())?;
        let finished = (state.readable || state.hung_up) && state.queued == 0;
        Ok(Available {
            read: state.queued,
            write: (state.writable && !finished) as usize,
            finished,
        })
    }

    fn should_notify(&self, _transfer: Transfer, _moved: usize) -> StreamResult<bool> {
        fd::wait_ready(self.socket.as_fd())
    }

    fn close(self: Box<Self>) -> StreamResult<()> {
        match self.socket.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Resolve `host` and connect to `port`, trying each resolved address in
/// turn. Nothing is left open when every attempt fails.
pub fn tcp_open(host: &str, port: u16) -> StreamResult<Stream> {
    tcp_open_with(host, port, &TcpConfig::default())
}

pub fn tcp_open_with(host: &str, port: u16, config: &TcpConfig) -> StreamResult<Stream> {
    let addrs = (host, port).to_socket_addrs().map_err(|err| {
        log::warn!("failed to resolve {}: {}", host, err);
        StreamError::from(err)
    })?;

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect(addr) {
            Ok(socket) => {
                socket.set_nodelay(config.nodelay)?;
                log::debug!("connected tcp stream to {} ({})", addr, host);
                return Ok(Stream::from_backend(TcpBackend { socket }));
            }
            Err(err) => {
                log::debug!("connect to {} failed: {}", addr, err);
                last_error = Some(err);
            }
        }
    }

    let err = last_error.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} did not resolve to any address", host),
        )
    });
    log::warn!("failed to connect to {}:{}: {}", host, port, err);
    Err(err.into())
}
