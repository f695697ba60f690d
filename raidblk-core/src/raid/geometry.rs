// vim: tw=80
//! Array geometry and sector placement

use std::ops::Range;
use crate::types::*;

/// Location of a sector within the array's member devices.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Sectorloc {
    /// Index of the member device within the array
    pub disk: usize,
    /// Physical sector within that device
    pub offset: SectorT,
}

impl Sectorloc {
    pub fn new(disk: usize, offset: SectorT) -> Self {
        Sectorloc {disk, offset}
    }
}

/// Immutable shape of an assembled array.
///
/// Logical sectors are striped one at a time across every device but the
/// last, which is reserved for parity.  Logical sector `s` lives on device
/// `s % data_devices` at physical sector `s / data_devices`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Geometry {
    /// Number of member devices, including the reserved one
    devices: usize,
    /// Size of each member device in sectors
    sectors_per_device: SectorT,
}

impl Geometry {
    pub const MIN_DEVICES: usize = 3;
    pub const MAX_DEVICES: usize = 4;

    /// Does an array of `n` devices make sense?
    pub fn check_devices(n: usize) -> Result<()> {
        if (Self::MIN_DEVICES..=Self::MAX_DEVICES).contains(&n) {
            Ok(())
        } else {
            Err(Error::InvalidConfiguration(n))
        }
    }

    pub fn new(devices: usize, sectors_per_device: SectorT) -> Result<Self> {
        Self::check_devices(devices)?;
        Ok(Geometry{devices, sectors_per_device})
    }

    /// Number of devices that hold data
    pub fn data_devices(&self) -> usize {
        self.devices - 1
    }

    /// Total number of member devices
    pub fn devices(&self) -> usize {
        self.devices
    }

    /// Inverse of [`sector2loc`](#method.sector2loc)
    pub fn loc2sector(&self, loc: Sectorloc) -> SectorT {
        debug_assert!(loc.disk < self.data_devices(),
            "The parity device holds no data");
        loc.offset * self.data_devices() as SectorT + loc.disk as SectorT
    }

    /// Iterate through the locations of a half-open range of logical sectors,
    /// in order.
    pub fn locate(&self, range: Range<SectorT>)
        -> impl Iterator<Item=(SectorT, Sectorloc)> + '_
    {
        range.map(move |s| (s, self.sector2loc(s)))
    }

    /// Index of the device reserved for parity
    pub fn parity_device(&self) -> usize {
        self.devices - 1
    }

    /// Map a logical sector to its location
    pub fn sector2loc(&self, sector: SectorT) -> Sectorloc {
        let m = self.data_devices() as SectorT;
        Sectorloc::new((sector % m) as usize, sector / m)
    }

    /// Usable size of the array in logical sectors
    pub fn sectors(&self) -> SectorT {
        self.sectors_per_device * self.data_devices() as SectorT
    }

    /// Size of each member device in sectors
    pub fn sectors_per_device(&self) -> SectorT {
        self.sectors_per_device
    }
}

// LCOV_EXCL_STOP
