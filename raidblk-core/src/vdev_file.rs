// vim: tw=80

use crate::{
    types::*,
    util::*,
    vdev::*
};
use futures::{
    FutureExt,
    TryFutureExt,
    future
};
use lazy_static::lazy_static;
use nix::{
    errno::Errno,
    fcntl::{Flock, FlockArg}
};
use std::{
    collections::HashMap,
    fmt,
    fs::{File, OpenOptions},
    io::{Seek, SeekFrom},
    os::unix::fs::FileExt,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError}
};
use tokio::task;

/// An exclusive claim on one file, held by one `Owner`.
struct Claim {
    owner: Owner,
    file: Arc<Flock<File>>,
    /// Number of `VdevFile`s currently sharing this claim
    opens: usize,
}

lazy_static! {
    /// Every file currently opened by any `VdevFile` in this process, indexed
    /// by canonical path.
    static ref CLAIMS: Mutex<HashMap<PathBuf, Claim>> =
        Mutex::new(HashMap::new());
}

/// `VdevFile`: File-backed implementation of `BlockDevice`
///
/// It works with both regular files and device nodes.  The file is opened for
/// exclusive reading and writing on behalf of a single `Owner`.  The same
/// `Owner` may open it again, in which case both `VdevFile`s share one
/// descriptor.  Anybody else gets `EBUSY`, including other processes, which
/// are kept out with `flock(2)`.
///
/// I/O operations on `VdevFile` happen immediately; they are not scheduled.
/// They run on Tokio's blocking thread pool, so they must be issued from
/// within a runtime context.
pub struct VdevFile {
    file:           Arc<Flock<File>>,
    /// The canonical name used to open this device
    path:           PathBuf,
    sectors:        SectorT,
}

impl VdevFile {
    /// Is the file at `path` currently claimed by any `VdevFile`?
    pub fn is_claimed<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().canonicalize()
            .map(|pb| {
                CLAIMS.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .contains_key(&pb)
            }).unwrap_or(false)
    }

    /// Open an existing file or device node.
    ///
    /// * `path`    Pathname for the file.  It may be a device node.
    /// * `owner`   Identity of the claim holder.
    pub fn open<P: AsRef<Path>>(path: P, owner: Owner) -> Result<Self> {
        let path = path.as_ref().canonicalize()?;
        let mut claims = CLAIMS.lock().unwrap_or_else(PoisonError::into_inner);
        let file = match claims.get_mut(&path) {
            Some(claim) if claim.owner == owner => {
                claim.opens += 1;
                claim.file.clone()
            },
            Some(_) => return Err(Error::DeviceIo(Errno::EBUSY)),
            None => {
                let f = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .open(&path)?;
                let locked = Flock::lock(f, FlockArg::LockExclusiveNonblock)
                    .map_err(|(_, e)| match e {
                        Errno::EWOULDBLOCK => Error::DeviceIo(Errno::EBUSY),
                        e => Error::DeviceIo(e)
                    })?;
                let file = Arc::new(locked);
                let claim = Claim{owner, file: file.clone(), opens: 1};
                claims.insert(path.clone(), claim);
                file
            }
        };
        match Self::measure(&file) {
            Ok(sectors) => Ok(VdevFile{file, path, sectors}),
            Err(e) => {
                release(&mut claims, &path);
                Err(e)
            }
        }
    }

    /// Size of the file in whole sectors.
    ///
    /// Device nodes don't report their size through `stat`, but they can
    /// still seek to the end.
    fn measure(file: &File) -> Result<SectorT> {
        let mut f = file;
        let bytes = f.seek(SeekFrom::End(0))?;
        Ok(bytes / BYTES_PER_SECTOR as u64)
    }

    /// The pathname used to open this device.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn check_bounds(&self, len: usize, sector: SectorT) -> Result<u64> {
        debug_assert_eq!(len % BYTES_PER_SECTOR, 0);
        let sectors = (len / BYTES_PER_SECTOR) as SectorT;
        match sector.checked_add(sectors) {
            Some(end) if end <= self.sectors => {
                // end is within the file, so this can't overflow
                Ok(sector * BYTES_PER_SECTOR as u64)
            }
            _ => {
                tracing::warn!(path = %self.path.display(), sector, sectors,
                    "I/O beyond the end of the device");
                Err(Error::DeviceIo(Errno::EIO))
            }
        }
    }
}

impl BlockDevice for VdevFile {
    fn sectors(&self) -> SectorT {
        self.sectors
    }

    fn read_at(&self, mut buf: IoVecMut, sector: SectorT) -> BoxVdevFut {
        let off = match self.check_bounds(buf.len(), sector) {
            Ok(off) => off,
            Err(e) => return Box::pin(future::err(e))
        };
        let file = self.file.clone();
        let fut = task::spawn_blocking(move || {
            file.read_exact_at(&mut buf[..], off)
        }).map(std::result::Result::unwrap)
        .map_err(Error::from);
        Box::pin(fut)
    }

    fn write_at(&self, buf: IoVec, sector: SectorT) -> BoxVdevFut {
        let off = match self.check_bounds(buf.len(), sector) {
            Ok(off) => off,
            Err(e) => return Box::pin(future::err(e))
        };
        let file = self.file.clone();
        let fut = task::spawn_blocking(move || {
            file.write_all_at(&buf[..], off)
        }).map(std::result::Result::unwrap)
        .map_err(Error::from);
        Box::pin(fut)
    }
}

impl fmt::Debug for VdevFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VdevFile")
            .field("path", &self.path)
            .field("sectors", &self.sectors)
            .finish()
    }
}

impl Drop for VdevFile {
    fn drop(&mut self) {
        let mut claims = CLAIMS.lock().unwrap_or_else(PoisonError::into_inner);
        release(&mut claims, &self.path);
    }
}

/// Give up one open of `path`'s claim.  The last one out removes it.
fn release(claims: &mut HashMap<PathBuf, Claim>, path: &Path) {
    if let Some(claim) = claims.get_mut(path) {
        claim.opens -= 1;
        if claim.opens == 0 {
            claims.remove(path);
            tracing::debug!(path = %path.display(), "released device");
        }
    }
}

/// Opens `VdevFile`s for an array.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileOpener;

impl DeviceOpener for FileOpener {
    fn open(&self, path: &Path, owner: Owner) -> Result<Box<dyn BlockDevice>> {
        let vdev = VdevFile::open(path, owner)?;
        Ok(Box::new(vdev))
    }
}
