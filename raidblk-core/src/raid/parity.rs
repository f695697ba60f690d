// vim: tw=80
//! Hook for offloading parity or checksum computation

#[cfg(test)] use mockall::automock;
use crate::types::*;
use super::geometry::Sectorloc;

/// Notification point for a parity or checksum engine.
///
/// The array reserves its last device for parity, but computes none itself.
/// Instead it tells the hook about every write.
#[cfg_attr(test, automock)]
pub trait ParityHook: Send + Sync {
    /// Called after each single-sector write has been dispatched to its data
    /// device.
    fn write_dispatched(&self, logical: SectorT, loc: Sectorloc);
}

/// A `ParityHook` that does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullParity;

impl ParityHook for NullParity {
    fn write_dispatched(&self, _logical: SectorT, _loc: Sectorloc) {}
}
