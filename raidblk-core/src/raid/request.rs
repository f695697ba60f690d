// vim: tw=80
//! Logical requests and the sub-requests they are split into

use std::{
    fmt,
    sync::Arc
};
use crate::{
    types::*,
    util::*,
};
use super::{
    completion::{Completion, CompletionGroup},
    geometry::Sectorloc,
};

/// Which way the data flows.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Read,
    Write
}

/// The data buffer of a request.  Its variant determines the direction.
#[derive(Debug)]
pub enum Payload {
    /// Destination of a read
    Read(IoVecMut),
    /// Source of a write
    Write(IoVec),
}

impl Payload {
    pub fn direction(&self) -> Direction {
        match self {
            Payload::Read(_) => Direction::Read,
            Payload::Write(_) => Direction::Write,
        }
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        match self {
            Payload::Read(buf) => buf.len(),
            Payload::Write(buf) => buf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length in whole sectors, rounded down
    pub fn sectors(&self) -> SectorT {
        (self.len() / BYTES_PER_SECTOR) as SectorT
    }

    /// Split off the first `sectors` sectors, leaving the rest in `self`.
    pub fn split_to(&mut self, sectors: SectorT) -> Payload {
        let at = sectors as usize * BYTES_PER_SECTOR;
        match self {
            Payload::Read(buf) => Payload::Read(buf.split_to(at)),
            Payload::Write(buf) => Payload::Write(buf.split_to(at)),
        }
    }
}

/// One I/O request against the array's logical address space.
pub struct LogicalRequest {
    /// First logical sector
    pub sector: SectorT,
    pub payload: Payload,
    /// Fires exactly once, after the whole request has been resolved
    pub completion: Completion,
}

impl LogicalRequest {
    pub fn new<F>(sector: SectorT, payload: Payload, completion: F) -> Self
        where F: FnOnce(Result<()>) + Send + 'static
    {
        LogicalRequest { sector, payload, completion: Box::new(completion) }
    }

    pub fn direction(&self) -> Direction {
        self.payload.direction()
    }

    /// Length in sectors
    pub fn sectors(&self) -> SectorT {
        self.payload.sectors()
    }
}

impl fmt::Debug for LogicalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicalRequest")
            .field("sector", &self.sector)
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}

/// A single-sector physical operation, bound for exactly one member device.
pub struct SubRequest {
    /// The logical sector that this sub-request was split from
    pub logical: SectorT,
    /// Where it lands
    pub loc: Sectorloc,
    /// One sector's worth of the parent request's buffer
    pub payload: Payload,
    /// The parent request's completion accounting
    pub(super) group: Arc<CompletionGroup>,
}

impl SubRequest {
    pub(super) fn new(logical: SectorT, loc: Sectorloc, payload: Payload,
                      group: Arc<CompletionGroup>) -> Self
    {
        debug_assert_eq!(payload.sectors(), 1);
        SubRequest { logical, loc, payload, group }
    }
}

impl fmt::Debug for SubRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubRequest")
            .field("logical", &self.logical)
            .field("loc", &self.loc)
            .field("direction", &self.payload.direction())
            .finish_non_exhaustive()
    }
}

// LCOV_EXCL_STOP
