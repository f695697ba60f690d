// vim: tw=80

use std::{
    path::Path,
    pin::Pin
};
#[cfg(test)] use mockall::automock;
use crate::types::*;

/// Future representing an operation on a member device.
pub type VdevFut = dyn futures::Future<Output = Result<()>> + Send;

/// Boxed `VdevFut`
pub type BoxVdevFut = Pin<Box<VdevFut>>;

/// A block device that may be a member of an array.
///
/// The array never looks inside its members.  All it needs is their size and
/// a way to asynchronously transfer whole sectors.  Each `read_at` or
/// `write_at` call submits the operation immediately; the returned future only
/// reports its completion.  Closing the device is done by dropping it.
#[cfg_attr(test, automock)]
pub trait BlockDevice: Send + Sync {
    /// Return the size of the device in sectors.
    ///
    /// May not change within the lifetime of the device.
    fn sectors(&self) -> SectorT;

    /// Asynchronously read a contiguous portion of the device.
    fn read_at(&self, buf: IoVecMut, sector: SectorT) -> BoxVdevFut;

    /// Asynchronously write a contiguous portion of the device.
    fn write_at(&self, buf: IoVec, sector: SectorT) -> BoxVdevFut;
}

/// Something that knows how to open member devices.
///
/// Opening is a blocking operation.  It only happens while an array is being
/// assembled.
#[cfg_attr(test, automock)]
pub trait DeviceOpener {
    /// Open the device at `path` for exclusive reading and writing on behalf of
    /// `owner`.
    fn open(&self, path: &Path, owner: Owner) -> Result<Box<dyn BlockDevice>>;
}
