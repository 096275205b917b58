//! Open modes shared by the memory and file backends

use crate::error::StreamError;
use std::fmt;
use std::str::FromStr;

/// Which directions a stream is opened for.
///
/// Parsed from the usual short strings: `"r"`, `"w"`, `"rw"`, `"wr"` and
/// `"a"` (append, implies write).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenMode {
    pub read: bool,
    pub write: bool,
    pub append: bool,
}

impl OpenMode {
    pub const READ: OpenMode = OpenMode {
        read: true,
        write: false,
        append: false,
    };
    pub const WRITE: OpenMode = OpenMode {
        read: false,
        write: true,
        append: false,
    };
    pub const READ_WRITE: OpenMode = OpenMode {
        read: true,
        write: true,
        append: false,
    };
}

impl FromStr for OpenMode {
    type Err = StreamError;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        let mut parsed = OpenMode::default();
        for ch in mode.chars() {
            match ch {
                'r' => parsed.read = true,
                'w' => parsed.write = true,
                'a' => {
                    parsed.write = true;
                    parsed.append = true;
                }
                other => {
                    return Err(StreamError::InvalidArgument(format!(
                        "unknown mode character {:?} in {:?}",
                        other, mode
                    )))
                }
            }
        }
        if !parsed.read && !parsed.write {
            return Err(StreamError::InvalidArgument(format!(
                "mode {:?} grants neither read nor write",
                mode
            )));
        }
        Ok(parsed)
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.read {
            write!(f, "r")?;
        }
        if self.append {
            write!(f, "a")
        } else if self.write {
            write!(f, "w")
        } else {
            Ok(())
        }
    }
}
