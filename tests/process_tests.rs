use nix::sys::signal::kill;
use nix::unistd::Pid;
use rs2_byte_stream::error::StreamError;
use rs2_byte_stream::{line_open, process_open, process_open_with, ProcessConfig, Stream};
use serial_test::serial;
use std::time::{Duration, Instant};

/// Read the next non-empty record, skipping calls that only buffered a
/// partial line.
fn next_record(line: &Stream) -> String {
    let mut buffer = [0u8; 1024];
    for _ in 0..1000 {
        let n = line.read(&mut buffer).unwrap();
        if n > 0 {
            return String::from_utf8_lossy(&buffer[..n]).into_owned();
        }
    }
    panic!("no record arrived");
}

#[test]
#[serial]
fn test_process_output_lines() {
    let process = process_open(&["printf", "foo\\nblah\\n"]).unwrap();
    let line = line_open(&process).unwrap();

    assert_eq!(next_record(&line), "foo");
    assert_eq!(next_record(&line), "blah");

    line.close().unwrap();
    process.close().unwrap();
}

#[test]
#[serial]
fn test_process_interactive() {
    let process = process_open(&["sh", "-c", "read foo ; echo -${foo}-"]).unwrap();
    let line = line_open(&process).unwrap();

    assert_eq!(process.write(b"wibble\n").unwrap(), 7);
    // The terminal echoes the input first
    assert_eq!(next_record(&line), "wibble");
    // Then the child's answer
    assert_eq!(next_record(&line), "-wibble-");

    line.close().unwrap();
    process.close().unwrap();
}

#[test]
#[serial]
fn test_process_output_ends_after_exit() {
    let process = process_open(&["printf", "done"]).unwrap();
    let mut buffer = [0u8; 64];
    let mut output = Vec::new();
    loop {
        let n = process.read(&mut buffer).unwrap();
        if n == 0 {
            break;
        }
        output.extend_from_slice(&buffer[..n]);
    }
    assert_eq!(output, b"done");

    let deadline = Instant::now() + Duration::from_secs(5);
    while !process.available().unwrap().finished {
        assert!(Instant::now() < deadline, "terminal never reported hang-up");
        std::thread::sleep(Duration::from_millis(10));
    }
    process.close().unwrap();
}

#[test]
#[serial]
fn test_process_available_reports_pending_output() {
    let process = process_open(&["sh", "-c", "echo ready; exec sleep 5"]).unwrap();

    // Nothing has been read yet, so only polling can notice the output
    let deadline = Instant::now() + Duration::from_secs(5);
    while !process.available().unwrap().is_readable() {
        assert!(Instant::now() < deadline, "output never became readable");
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(!process.available().unwrap().finished);

    let started = Instant::now();
    process.close().unwrap();
    // SIGTERM is enough for sleep, so the grace period is not used up
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
#[serial]
fn test_close_reaps_child_that_ignores_sigterm() {
    let config = ProcessConfig::new()
        .grace_period(Duration::from_millis(300))
        .poll_interval(Duration::from_millis(10));
    // exec keeps the pid, so the shell's $$ is the pid of the sleeping child
    let process = process_open_with(
        &["sh", "-c", "trap '' TERM; echo $$; exec sleep 30"],
        &config,
    )
    .unwrap();
    let line = line_open(&process).unwrap();
    let pid = Pid::from_raw(next_record(&line).trim().parse().unwrap());
    line.close().unwrap();

    let started = Instant::now();
    process.close().unwrap();
    assert!(started.elapsed() >= Duration::from_millis(300));

    // Reaped: the pid no longer exists, not even as a zombie
    assert_eq!(kill(pid, None), Err(nix::errno::Errno::ESRCH));
}

#[test]
#[serial]
fn test_terminal_is_the_controlling_tty() {
    let process = process_open(&["sh", "-c", "echo hi > /dev/tty; sleep 1"]).unwrap();
    let line = line_open(&process).unwrap();

    assert_eq!(next_record(&line), "hi");

    line.close().unwrap();
    process.close().unwrap();
}

#[test]
#[serial]
fn test_interrupt_character_reaches_the_child() {
    let process = process_open(&["sh", "-c", "echo ready; exec sleep 30"]).unwrap();
    let line = line_open(&process).unwrap();
    assert_eq!(next_record(&line), "ready");

    // ^C on the terminal raises SIGINT in the foreground process group
    assert_eq!(process.write(b"\x03").unwrap(), 1);
    // Drain the echoed "^C" until the terminal hangs up
    let mut scratch = [0u8; 64];
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let available = process.available().unwrap();
        if available.finished {
            break;
        }
        assert!(Instant::now() < deadline, "child survived the interrupt");
        if available.is_readable() {
            process.read(&mut scratch).unwrap();
        } else {
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    line.close().unwrap();
    process.close().unwrap();
}

#[test]
fn test_spawn_failure_is_an_error() {
    match process_open(&["/definitely/not/a/program"]) {
        Err(err) => assert_eq!(err.kind(), std::io::ErrorKind::NotFound),
        Ok(_) => panic!("spawning a missing program should fail"),
    }
}

#[test]
fn test_empty_arguments_are_rejected() {
    let args: [&str; 0] = [];
    assert!(matches!(process_open(&args), Err(StreamError::InvalidArgument(_))));
}
