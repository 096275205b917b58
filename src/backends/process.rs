//! Child process attached to a pseudo-terminal.
//!
//! The parent side of the terminal is the stream's read/write channel. The
//! stream owns the child: closing it terminates and reaps the process before
//! the terminal descriptor is released. The child leads its own session
//! with the terminal as its controlling tty.

use crate::error::{StreamError, StreamResult};
use crate::stream::{fd, Available, Backend, Stream, Transfer};
use crate::stream_configuration::ProcessConfig;
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::libc;
use nix::pty::{openpty, OpenptyResult};
use nix::sys::signal::{kill, Signal};
use nix::unistd::{setsid, Pid};
use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, OwnedFd};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Instant;

struct ProcessBackend {
    terminal: File,
    child: Option<Child>,
    config: ProcessConfig,
}

impl ProcessBackend {
    /// SIGTERM, wait out the grace period, then SIGKILL and reap. The child
    /// is always reaped, even when an earlier step fails.
    fn shutdown(&mut self) -> StreamResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let pid = Pid::from_raw(child.id() as i32);
        let mut first_error: Option<StreamError> = None;

        if let Ok(None) = child.try_wait() {
            match kill(pid, Signal::SIGTERM) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(err) => first_error = Some(err.into()),
            }

            let deadline = Instant::now() + self.config.grace_period;
            while Instant::now() < deadline {
                match child.try_wait() {
                    Ok(Some(status)) => {
                        log::debug!("process {} exited with {}", pid, status);
                        return first_error.map_or(Ok(()), Err);
                    }
                    Ok(None) => thread::sleep(self.config.poll_interval),
                    Err(err) => {
                        first_error.get_or_insert(err.into());
                        break;
                    }
                }
            }

            log::warn!(
                "process {} ignored SIGTERM for {:?}, sending SIGKILL",
                pid,
                self.config.grace_period
            );
            if let Err(err) = child.kill() {
                if err.kind() != io::ErrorKind::InvalidInput {
                    first_error.get_or_insert(err.into());
                }
            }
        }

        match child.wait() {
            Ok(status) => log::debug!("process {} reaped with {}", pid, status),
            Err(err) => {
                first_error.get_or_insert(err.into());
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Backend for ProcessBackend {
    fn kind(&self) -> &'static str {
        "process"
    }

    fn can_read(&self) -> bool {
        true
    }

    fn can_write(&self) -> bool {
        true
    }

    /// Once the child has hung up the terminal reports EIO; that is the end
    /// of its output, not a failure.
    fn read(&self, dst: &mut [u8]) -> StreamResult<usize> {
        let mut terminal = &self.terminal;
        loop {
            match terminal.read(dst) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) if err.raw_os_error() == Some(Errno::EIO as i32) => return Ok(0),
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn write(&self, src: &[u8]) -> StreamResult<usize> {
        let mut terminal = &self.terminal;
        loop {
            match terminal.write(src) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn available(&self) -> StreamResult<Available> {
        let state = fd::probe(self.terminal.as_fd())?;
        // A hung-up terminal keeps polling readable so the last read can see
        // EIO; only the queue length tells buffered output from the end.
        let finished = state.hung_up && state.queued == 0;
        Ok(Available {
            read: if finished { 0 } else { state.queued.max(state.readable as usize) },
            write: (state.writable && !state.hung_up) as usize,
            finished,
        })
    }

    fn should_notify(&self, _transfer: Transfer, _moved: usize) -> StreamResult<bool> {
        fd::wait_ready(self.terminal.as_fd())
    }

    fn close(mut self: Box<Self>) -> StreamResult<()> {
        self.shutdown()
    }
}

impl Drop for ProcessBackend {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log::error!("failed to reap child process: {}", err);
        }
    }
}

nix::ioctl_write_int_bad!(tiocsctty, libc::TIOCSCTTY);

/// Runs in the child after its stdio has been pointed at the terminal: start
/// a new session and take the terminal on stdin as its controlling tty, so
/// `/dev/tty`, job control and terminal signals work as under `login_tty`.
fn attach_controlling_terminal() -> io::Result<()> {
    setsid()?;
    // SAFETY: fd 0 is the slave terminal; TIOCSCTTY takes an int argument.
    unsafe { tiocsctty(0, 0) }?;
    Ok(())
}

fn set_cloexec(fd: &OwnedFd) -> StreamResult<()> {
    fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    Ok(())
}

/// Spawn `args[0]` (looked up on `PATH`) with the remaining arguments,
/// attached to a fresh pseudo-terminal.
pub fn process_open<S: AsRef<OsStr>>(args: &[S]) -> StreamResult<Stream> {
    process_open_with(args, &ProcessConfig::default())
}

pub fn process_open_with<S: AsRef<OsStr>>(args: &[S], config: &ProcessConfig) -> StreamResult<Stream> {
    let (program, rest) = args.split_first().ok_or_else(|| {
        StreamError::InvalidArgument("process arguments must name a program".to_string())
    })?;

    let OpenptyResult { master, slave } = openpty(None, None)?;
    set_cloexec(&master)?;
    set_cloexec(&slave)?;

    // The command owns the parent's copies of the terminal; dropping it at
    // the end of this block leaves the child as the only holder.
    let child = {
        let mut command = Command::new(program);
        command
            .args(rest)
            .stdin(Stdio::from(slave.try_clone()?))
            .stdout(Stdio::from(slave.try_clone()?))
            .stderr(Stdio::from(slave));
        // SAFETY: the hook runs in the forked child before exec and only
        // makes the async-signal-safe setsid(2) and ioctl(2) calls.
        unsafe {
            command.pre_exec(attach_controlling_terminal);
        }
        command.spawn().map_err(|err| {
            log::warn!("failed to spawn {:?}: {}", program.as_ref(), err);
            StreamError::from(err)
        })?
    };

    log::debug!("spawned process {:?} as pid {}", program.as_ref(), child.id());
    Ok(Stream::from_backend(ProcessBackend {
        terminal: File::from(master),
        child: Some(child),
        config: config.clone(),
    }))
}
