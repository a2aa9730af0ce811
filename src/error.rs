use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// Backend persistence failure. Writes already handed to the store for
    /// earlier file segments stay durable; the cursor stops at the last one.
    Io(std::io::Error),
    /// Invalid session configuration, detected at creation time.
    Configuration(&'static str),
    /// Byte order / element kind / byte width triple outside the recognized set.
    UnsupportedType {
        byte_order: char,
        kind: char,
        width: usize,
    },
    /// Continuous write did not start at the expected next index.
    Continuity { expected: u64, got: u64 },
    /// Global-index and block-offset arrays differ in length.
    ShapeMismatch { index_len: usize, offset_len: usize },
    /// Data vector length is not a whole number of samples.
    VectorShape {
        bytes: usize,
        bytes_per_sample: usize,
    },
    /// Indexes or offsets out of order, or runs overlapping.
    Ordering(&'static str),
    /// Block offset points past the end of the data vector.
    Bounds { offset: u64, data_len: u64 },
    /// Operation attempted on a closed session.
    ClosedSession,
    /// Sample time falls outside the representable calendar range.
    ClockRange(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Configuration(msg) => write!(f, "invalid configuration: {msg}"),
            Error::UnsupportedType {
                byte_order,
                kind,
                width,
            } => write!(
                f,
                "unsupported sample type: byte order '{byte_order}', kind '{kind}', width {width}"
            ),
            Error::Continuity { expected, got } => write!(
                f,
                "continuity violation: expected sample index {expected}, got {got}"
            ),
            Error::ShapeMismatch {
                index_len,
                offset_len,
            } => write!(
                f,
                "shape mismatch: {index_len} global indexes vs {offset_len} block offsets"
            ),
            Error::VectorShape {
                bytes,
                bytes_per_sample,
            } => write!(
                f,
                "data vector of {bytes} bytes is not a multiple of the {bytes_per_sample}-byte sample size"
            ),
            Error::Ordering(msg) => write!(f, "ordering violation: {msg}"),
            Error::Bounds { offset, data_len } => write!(
                f,
                "block offset {offset} out of bounds for data vector of {data_len} samples"
            ),
            Error::ClosedSession => write!(f, "session is closed"),
            Error::ClockRange(msg) => write!(f, "clock range: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
