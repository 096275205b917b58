use quickcheck::{quickcheck, TestResult};
use rs2_byte_stream::error::StreamError;
use rs2_byte_stream::{
    file_open, line_open, line_open_with, mem_open, pipe_open, LineConfig, MemoryBuffer, Stream,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn record(buffer: &[u8], len: usize) -> &str {
    assert_eq!(buffer[len], 0, "records are NUL-terminated");
    std::str::from_utf8(&buffer[..len]).unwrap()
}

fn memory_source(bytes: &[u8]) -> Stream {
    mem_open(MemoryBuffer::from(bytes), "r").unwrap()
}

#[test]
fn test_line_reader() {
    // Includes the trailing NUL a C string literal would carry
    let input = memory_source(b"line 1\nline 2\r\n\nline 4\n\0");
    let line = line_open(&input).unwrap();
    let mut buffer = [0u8; 80];

    let n = line.read(&mut buffer).unwrap();
    assert_eq!((n, record(&buffer, n)), (6, "line 1"));
    let n = line.read(&mut buffer).unwrap();
    assert_eq!((n, record(&buffer, n)), (6, "line 2"));

    // Data should still be available
    let available = line.available().unwrap();
    assert!(!available.finished);
    assert!(available.is_readable());

    // The blank line
    assert_eq!(line.read(&mut buffer).unwrap(), 0);

    let n = line.read(&mut buffer).unwrap();
    assert_eq!((n, record(&buffer, n)), (6, "line 4"));

    // The NUL byte ends an empty record
    assert_eq!(line.read(&mut buffer).unwrap(), 0);
    assert!(line.available().unwrap().finished);

    line.close().unwrap();
    input.close().unwrap();
}

#[test]
fn test_crlf_is_a_single_delimiter() {
    let input = memory_source(b"a\r\nb\rc\n");
    let line = line_open(&input).unwrap();
    let mut buffer = [0u8; 16];

    let mut records = Vec::new();
    loop {
        let ready = line.available().unwrap();
        if ready.finished {
            break;
        }
        let n = line.read(&mut buffer).unwrap();
        records.push(record(&buffer, n).to_string());
    }
    assert_eq!(records, vec!["a", "b", "c"]);
}

#[test]
fn test_crlf_split_across_parent_reads() {
    let pipe = pipe_open(64).unwrap();
    let line = line_open(&pipe).unwrap();
    let mut buffer = [0u8; 16];

    pipe.write(b"first\r").unwrap();
    let n = line.read(&mut buffer).unwrap();
    assert_eq!(record(&buffer, n), "first");

    pipe.write(b"\nsecond\n").unwrap();
    let n = line.read(&mut buffer).unwrap();
    assert_eq!(record(&buffer, n), "second");
    assert_eq!(line.available().unwrap().read, 0);
}

#[test]
fn test_partial_record_waits_for_its_delimiter() {
    let pipe = pipe_open(64).unwrap();
    let line = line_open(&pipe).unwrap();
    let mut buffer = [0u8; 16];

    pipe.write(b"hel").unwrap();
    assert_eq!(line.read(&mut buffer).unwrap(), 0);
    let available = line.available().unwrap();
    assert_eq!(available.read, 0);
    assert!(!available.finished);

    pipe.write(b"lo\nworld\n").unwrap();
    let n = line.read(&mut buffer).unwrap();
    assert_eq!(record(&buffer, n), "hello");
    // The next record is already buffered
    assert_eq!(line.available().unwrap().read, 1);
    let n = line.read(&mut buffer).unwrap();
    assert_eq!(record(&buffer, n), "world");
}

#[test]
fn test_records_are_truncated_to_the_destination() {
    let input = memory_source(b"abcdefgh\nij\n");
    let line = line_open(&input).unwrap();
    let mut small = [0xffu8; 5];

    assert_eq!(line.read(&mut small).unwrap(), 4);
    assert_eq!(&small, b"abcd\0");
    // The rest of the truncated record is dropped
    let mut buffer = [0u8; 16];
    let n = line.read(&mut buffer).unwrap();
    assert_eq!(record(&buffer, n), "ij");
}

#[test]
fn test_unterminated_tail_is_flushed_at_end_of_data() {
    let input = memory_source(b"one\ntail");
    let line = line_open(&input).unwrap();
    let mut buffer = [0u8; 16];

    let n = line.read(&mut buffer).unwrap();
    assert_eq!(record(&buffer, n), "one");
    let n = line.read(&mut buffer).unwrap();
    assert_eq!(record(&buffer, n), "tail");
    assert!(line.available().unwrap().finished);
}

#[test]
fn test_record_too_long() {
    let pipe = pipe_open(64).unwrap();
    let line = line_open_with(&pipe, &LineConfig::new().capacity(8)).unwrap();
    let mut buffer = [0u8; 16];

    pipe.write(b"0123456789").unwrap();
    assert_eq!(line.read(&mut buffer).unwrap(), 0);
    assert!(matches!(
        line.read(&mut buffer),
        Err(StreamError::RecordTooLong { capacity: 8 })
    ));
}

#[test]
fn test_line_requires_a_readable_parent() {
    let write_only = mem_open(MemoryBuffer::zeroed(8), "w").unwrap();
    assert!(matches!(line_open(&write_only), Err(StreamError::Unsupported(_))));

    let closed = pipe_open(8).unwrap();
    let handle = closed.clone();
    closed.close().unwrap();
    assert!(matches!(line_open(&handle), Err(StreamError::InvalidArgument(_))));

    let input = memory_source(b"x\n");
    assert!(matches!(
        line_open_with(&input, &LineConfig::new().capacity(0)),
        Err(StreamError::InvalidArgument(_))
    ));
}

#[test]
fn test_line_is_read_only() {
    let input = memory_source(b"x\n");
    let line = line_open(&input).unwrap();
    assert!(matches!(line.write(b"y"), Err(StreamError::Unsupported(_))));
    assert_eq!(line.available().unwrap().write, 0);
}

#[test]
fn test_line_takes_over_and_releases_parent_listener() {
    let pipe = pipe_open(64).unwrap();
    let original = Arc::new(AtomicUsize::new(0));
    let counter = original.clone();
    pipe.set_notify(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let line = line_open(&pipe).unwrap();
    let chained = Arc::new(AtomicUsize::new(0));
    let counter = chained.clone();
    line.set_notify(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    // Parent activity now reaches the line stream's listener only
    pipe.write(b"x\n").unwrap();
    assert_eq!(original.load(Ordering::SeqCst), 0);
    assert_eq!(chained.load(Ordering::SeqCst), 1);

    line.close().unwrap();
    assert!(!pipe.has_notify());
    // Closing the decorator leaves the parent open
    assert!(!pipe.is_closed());
    assert_eq!(pipe.write(b"y").unwrap(), 1);
}

#[test]
fn test_line_readiness_wakes_waiting_reader() {
    let pipe = pipe_open(64).unwrap();
    let line = line_open(&pipe).unwrap();
    let ready = line.subscribe();

    let writer = {
        let pipe = pipe.clone();
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(100));
            pipe.write(b"ping\n").unwrap();
        })
    };

    // The pipe write fires the chained listener, after which a read finds the record
    ready.wait_until(|| pipe.available().map(|a| a.is_readable()).unwrap_or(false));
    let mut buffer = [0u8; 16];
    let n = line.read(&mut buffer).unwrap();
    assert_eq!(record(&buffer, n), "ping");
    writer.join().unwrap();
}

#[test]
fn test_line_framing_matches_a_split() {
    fn prop(lines: Vec<Vec<u8>>) -> TestResult {
        // Keep records free of delimiters and small enough for the buffer
        let lines: Vec<Vec<u8>> = lines
            .into_iter()
            .map(|l| l.into_iter().filter(|b| !matches!(b, b'\r' | b'\n' | 0)).take(64).collect())
            .collect();
        if lines.len() > 32 {
            return TestResult::discard();
        }

        let mut encoded = Vec::new();
        for (i, l) in lines.iter().enumerate() {
            encoded.extend_from_slice(l);
            encoded.extend_from_slice(if i % 2 == 0 { b"\n" } else { b"\r\n" });
        }

        let input = mem_open(MemoryBuffer::from(encoded), "r").unwrap();
        let line = line_open(&input).unwrap();
        let mut buffer = [0u8; 128];
        for expected in &lines {
            let n = match line.read(&mut buffer) {
                Ok(n) => n,
                Err(_) => return TestResult::failed(),
            };
            if &buffer[..n] != &expected[..] {
                return TestResult::failed();
            }
        }
        // A trailing LF may still sit in the parent if a read stopped on its CR
        if line.read(&mut buffer).unwrap() != 0 {
            return TestResult::failed();
        }
        TestResult::from_bool(line.available().unwrap().finished)
    }

    quickcheck(prop as fn(Vec<Vec<u8>>) -> TestResult);
}

#[test]
fn test_file_parent_keeps_unterminated_tail() {
    let path = std::env::temp_dir().join(format!("rs2_byte_stream_{}_line_tail", std::process::id()));
    std::fs::write(&path, b"one\ntail").unwrap();

    let file = file_open(&path, "r").unwrap();
    let line = line_open(&file).unwrap();
    let mut buffer = [0u8; 16];
    let n = line.read(&mut buffer).unwrap();
    assert_eq!(record(&buffer, n), "one");

    // A file cannot say it has ended, so the tail stays buffered
    assert_eq!(line.read(&mut buffer).unwrap(), 0);
    assert_eq!(line.read(&mut buffer).unwrap(), 0);
    let available = line.available().unwrap();
    assert_eq!(available.read, 0);
    assert!(!available.finished);

    line.close().unwrap();
    file.close().unwrap();
    std::fs::remove_file(&path).unwrap();
}
