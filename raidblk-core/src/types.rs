// vim: tw=80
//! Common type definitions used throughout raidblk

use divbuf::{DivBuf, DivBufMut};
use nix::errno::Errno;
use thiserror::Error;
use std::{
    fmt::{self, Display, Formatter},
    io,
    path::PathBuf,
};

/// Our `IoVec`.  Unlike the standard library's, ours is reference-counted so it
/// can have more than one owner.
pub type IoVec = DivBuf;

/// Mutable version of `IoVec`.  Uniquely owned.
pub type IoVecMut = DivBufMut;

/// Indexes a sector, either logical or physical.  Sectors are always 512
/// bytes.
pub type SectorT = u64;

/// raidblk's error type.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    /// The array was given the wrong number of member devices.
    #[error("An array needs 3 or 4 devices, but {0} were given")]
    InvalidConfiguration(usize),

    /// An array configuration file could not be parsed.
    #[error("Invalid array configuration: {0}")]
    BadConfigFile(String),

    /// A member device could not be opened.
    #[error("Failed to open {}: {source}", path.display())]
    DeviceOpenFailed {
        path: PathBuf,
        source: Errno
    },

    /// A member device's size disagrees with device 0.
    #[error("Device {index} has {actual} sectors, but device 0 has {expected}")]
    GeometryMismatch {
        index: usize,
        expected: SectorT,
        actual: SectorT
    },

    /// A request's buffer is not a whole number of sectors.
    #[error("Request length {0} is not a multiple of the sector size")]
    UnalignedRequest(usize),

    /// The split pool was exhausted while decomposing a request.
    #[error("Could not allocate a sub-request")]
    SubRequestAllocationFailed,

    /// A physical operation failed on an underlying device.
    #[error("Device I/O error: {0}")]
    DeviceIo(#[from] Errno),
}

impl Error {
    /// The closest errno to this error, suitable for reporting to a block
    /// layer or as a process exit status.
    pub fn errno(&self) -> Errno {
        match self {
            Error::InvalidConfiguration(_) => Errno::EINVAL,
            Error::BadConfigFile(_) => Errno::EINVAL,
            Error::DeviceOpenFailed{source, ..} => *source,
            Error::GeometryMismatch{..} => Errno::EINVAL,
            Error::SubRequestAllocationFailed => Errno::EIO,
            Error::UnalignedRequest(_) => Errno::EINVAL,
            Error::DeviceIo(e) => *e,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        let errno = e.raw_os_error()
            .map(Errno::from_raw)
            .unwrap_or(Errno::EIO);
        Error::DeviceIo(errno)
    }
}

pub type Result<T> = ::std::result::Result<T, Error>;

/// Identifies the holder of a device's exclusive claim.
///
/// Each assembled array gets its own `Owner`.  A device may be opened more
/// than once by the same `Owner`, but never by two different ones.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Owner(uuid::Uuid);

impl Owner {
    pub fn new_v4() -> Self {
        Owner(uuid::Uuid::new_v4())
    }
}

// LCOV_EXCL_START      only used by debugging code
impl Display for Owner {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}
// LCOV_EXCL_STOP

// LCOV_EXCL_STOP
