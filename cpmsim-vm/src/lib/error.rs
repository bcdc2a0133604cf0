use std::fmt;
use std::io;
use std::path::PathBuf;

/// Which way a sector was travelling when something went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Read => write!(f, "read"),
            Direction::Write => write!(f, "written"),
        }
    }
}

/// Every failure the emulated peripherals can report. All of them are fatal
/// to the machine; it is up to the caller to decide what to do about it.
#[derive(Debug)]
pub enum VmError {
    /// No usable backing file for the addressed drive.
    Configuration(String),
    /// A sector transfer moved the wrong number of bytes.
    TransferSize {
        direction: Direction,
        expected: usize,
        actual: usize,
    },
    /// The host refused some other part of a disk transfer.
    DiskIo {
        path: PathBuf,
        source: io::Error,
    },
    /// The 128-byte DMA window would run off the end of memory.
    DmaOutOfBounds {
        address: u16,
    },
    /// Sectors are numbered from 1.
    InvalidSector {
        track: u8,
        sector: u8,
    },
    /// The console readiness check itself failed.
    Poll(io::Error),
    Console(io::Error),
    Boot(String),
}

pub type VmResult<T> = Result<T, VmError>;

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::Configuration(msg) => write!(f, "{}", msg),
            VmError::TransferSize { direction, expected, actual } =>
                write!(f, "Bytes {} is {} instead of {}", direction, actual, expected),
            VmError::DiskIo { path, source } =>
                write!(f, "I/O error on disk image '{}': {}", path.display(), source),
            VmError::DmaOutOfBounds { address } =>
                write!(f, "DMA address {:#06X} does not leave room for a whole sector", address),
            VmError::InvalidSector { track, sector } =>
                write!(f, "Invalid sector {} on track {}: sectors start at 1", sector, track),
            VmError::Poll(e) => write!(f, "poll failed: {}", e),
            VmError::Console(e) => write!(f, "Console I/O failed: {}", e),
            VmError::Boot(msg) => write!(f, "Boot failed: {}", msg),
        }
    }
}

impl std::error::Error for VmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VmError::DiskIo { source, .. } => Some(source),
            VmError::Poll(e) | VmError::Console(e) => Some(e),
            _ => None,
        }
    }
}
