//! Descriptor readiness helpers for the file, process and TCP backends.
//!
//! All `poll(2)` and `ioctl(2)` calls live here.

use crate::error::StreamResult;
use nix::errno::Errno;
use nix::libc;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::os::fd::{AsRawFd, BorrowedFd};

nix::ioctl_read_bad!(fionread, libc::FIONREAD, libc::c_int);

fn poll_once(fd: BorrowedFd<'_>, events: PollFlags, timeout: PollTimeout) -> StreamResult<PollFlags> {
    let mut fds = [PollFd::new(fd, events)];
    loop {
        match poll(&mut fds, timeout) {
            Ok(0) => return Ok(PollFlags::empty()),
            Ok(_) => return Ok(fds[0].revents().unwrap_or_else(PollFlags::empty)),
            Err(Errno::EINTR) => continue,
            Err(err) => return Err(err.into()),
        }
    }
}

/// Block until the descriptor is readable or writable (or has hung up).
pub(crate) fn wait_ready(fd: BorrowedFd<'_>) -> StreamResult<bool> {
    let revents = poll_once(fd, PollFlags::POLLIN | PollFlags::POLLOUT, PollTimeout::NONE)?;
    Ok(!revents.is_empty())
}

/// Bytes waiting in the descriptor's receive queue
pub(crate) fn queued_bytes(fd: BorrowedFd<'_>) -> StreamResult<usize> {
    let mut count: libc::c_int = 0;
    // SAFETY: `fd` is a live descriptor for the duration of the borrow and
    // FIONREAD writes exactly one c_int into `count`.
    unsafe { fionread(fd.as_raw_fd(), &mut count) }?;
    Ok(count.max(0) as usize)
}

/// Snapshot of a descriptor's state without blocking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct FdReadiness {
    pub readable: bool,
    pub writable: bool,
    pub hung_up: bool,
    /// Bytes that a read would return right now
    pub queued: usize,
}

pub(crate) fn probe(fd: BorrowedFd<'_>) -> StreamResult<FdReadiness> {
    let revents = poll_once(fd, PollFlags::POLLIN | PollFlags::POLLOUT, PollTimeout::ZERO)?;
    let readable = revents.contains(PollFlags::POLLIN);
    Ok(FdReadiness {
        readable,
        writable: revents.contains(PollFlags::POLLOUT),
        hung_up: revents.intersects(PollFlags::POLLHUP | PollFlags::POLLERR),
        queued: if readable { queued_bytes(fd)? } else { 0 },
    })
}
