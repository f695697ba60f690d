// vim: tw=80

use futures::{
    Future,
    FutureExt,
    channel::oneshot
};
use nix::errno::Errno;
use std::{
    fmt,
    path::Path,
    sync::Arc
};
use tokio::{
    runtime::Handle,
    sync::{OwnedSemaphorePermit, Semaphore}
};
use tracing_futures::Instrument;
use crate::{
    config::ArrayConfig,
    types::*,
    util::BYTES_PER_SECTOR,
    vdev::*,
};
use super::{
    completion::CompletionGroup,
    devices::DeviceSet,
    geometry::Geometry,
    parity::{NullParity, ParityHook},
    request::*,
};

/// A striped array of 3 or 4 block devices, presented as one logical device.
///
/// Logical sectors are distributed round-robin across every member but the
/// last, which is reserved for a parity engine.  Each request is split into
/// single-sector sub-requests, which are submitted to their members
/// concurrently and reported back through a single completion.
pub struct Array {
    devices: DeviceSet,
    geometry: Geometry,
    parity: Arc<dyn ParityHook>,
    /// Permits for split-off sub-requests
    splits: Arc<Semaphore>,
    /// Runtime on which sub-requests are driven
    runtime: Handle,
}

impl Array {
    /// Assemble an array from its member devices, with an unbounded split
    /// pool.
    ///
    /// Must be called from within a Tokio runtime.  Sub-requests will run on
    /// that runtime for the life of the array.
    pub async fn assemble<P>(opener: &dyn DeviceOpener, paths: &[P])
        -> Result<Self>
        where P: AsRef<Path>
    {
        Self::assemble_with(opener, &ArrayConfig::new(paths)).await
    }

    /// Assemble an array as described by `config`.
    #[tracing::instrument(skip(opener))]
    pub async fn assemble_with(opener: &dyn DeviceOpener, config: &ArrayConfig)
        -> Result<Self>
    {
        let owner = Owner::new_v4();
        let (devices, geometry) = DeviceSet::assemble(opener, &config.devices,
                                                      owner)?;
        let permits = config.max_split_subrequests
            .map(|n| n.get().min(Semaphore::MAX_PERMITS))
            .unwrap_or(Semaphore::MAX_PERMITS);
        tracing::info!(%owner, devices = geometry.devices(),
            sectors = geometry.sectors(), "assembled array");
        Ok(Array {
            devices,
            geometry,
            parity: Arc::new(NullParity),
            splits: Arc::new(Semaphore::new(permits)),
            runtime: Handle::current(),
        })
    }

    /// Replace the parity hook.
    pub fn with_parity_hook(mut self, parity: Arc<dyn ParityHook>) -> Self {
        self.parity = parity;
        self
    }

    /// Submit one single-sector sub-request to its device.
    ///
    /// `permit`, if any, is held until the sub-request completes.
    fn dispatch(&self, sub: SubRequest, permit: Option<OwnedSemaphorePermit>) {
        let SubRequest{logical, loc, payload, group} = sub;
        let direction = payload.direction();
        let device = self.devices.get(loc.disk);
        tracing::trace!(?direction, logical,
            path = %self.devices.path(loc.disk).display(),
            offset = loc.offset, "submit");
        let fut = match payload {
            Payload::Read(buf) => device.read_at(buf, loc.offset),
            Payload::Write(buf) => device.write_at(buf, loc.offset),
        };
        let span = tracing::trace_span!("subrequest", logical,
            disk = loc.disk, offset = loc.offset);
        self.runtime.spawn(async move {
            let r = fut.await;
            if let Err(e) = &r {
                tracing::warn!(?direction, error = %e, "sub-request failed");
            }
            drop(permit);
            group.complete(r);
        }.instrument(span));
        if direction == Direction::Write {
            self.parity.write_dispatched(logical, loc);
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Submit a logical request.
    ///
    /// The request is split into one sub-request per sector, each of which is
    /// submitted to its device before this method returns.  The request's
    /// completion fires once all of them have finished, possibly before this
    /// method returns.
    ///
    /// The caller is responsible for keeping the request within the bounds of
    /// the array.  A payload that isn't a whole number of sectors is failed
    /// without touching any device.
    pub fn handle_request(&self, req: LogicalRequest) {
        let LogicalRequest{sector, payload, completion} = req;
        let group = Arc::new(CompletionGroup::new(completion));
        if payload.len() % BYTES_PER_SECTOR != 0 {
            tracing::error!(sector, len = payload.len(),
                "Request is not a whole number of sectors");
            group.complete(Err(Error::UnalignedRequest(payload.len())));
            return;
        }
        if payload.is_empty() {
            group.complete(Ok(()));
            return;
        }
        let nsectors = payload.sectors();
        debug_assert!(sector + nsectors <= self.geometry.sectors(),
            "Request beyond the end of the array");
        let _guard = self.runtime.enter();
        let end = sector + nsectors;
        let mut rest = payload;
        for (s, loc) in self.geometry.locate(sector..end) {
            if s + 1 == end {
                // The remainder is down to one sector.  It completes on the
                // group's initial registration.
                self.dispatch(SubRequest::new(s, loc, rest, group), None);
                return;
            }
            let permit = match self.splits.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!(logical = s, remaining = end - s,
                        "No sub-request resources available");
                    group.complete(Err(Error::SubRequestAllocationFailed));
                    return;
                }
            };
            let head = rest.split_to(1);
            group.register();
            self.dispatch(SubRequest::new(s, loc, head, group.clone()),
                          Some(permit));
        }
    }

    /// Identity under which the members are held
    pub fn owner(&self) -> Owner {
        self.devices.owner()
    }

    /// Name of member device `index`
    pub fn path(&self, index: usize) -> &Path {
        self.devices.path(index)
    }

    /// Read `buf.len()` bytes starting at logical sector `sector`.
    pub fn read_at(&self, buf: IoVecMut, sector: SectorT)
        -> impl Future<Output=Result<()>>
    {
        self.submit(sector, Payload::Read(buf))
    }

    /// Usable size of the array in sectors
    pub fn sectors(&self) -> SectorT {
        self.geometry.sectors()
    }

    fn submit(&self, sector: SectorT, payload: Payload)
        -> impl Future<Output=Result<()>>
    {
        let (tx, rx) = oneshot::channel::<Result<()>>();
        self.handle_request(LogicalRequest::new(sector, payload, move |r| {
            // The receiver may have lost interest
            let _ = tx.send(r);
        }));
        rx.map(|r| r.unwrap_or(Err(Error::DeviceIo(Errno::ECANCELED))))
    }

    /// Close every member device.
    ///
    /// Callers should wait for every outstanding completion first.  Requests
    /// still in flight will finish, but the members' claims are released
    /// immediately.
    pub fn teardown(self) {
        tracing::info!(owner = %self.devices.owner(), "tearing down array");
        self.devices.close();
    }

    /// Write `buf` starting at logical sector `sector`.
    pub fn write_at(&self, buf: IoVec, sector: SectorT)
        -> impl Future<Output=Result<()>>
    {
        self.submit(sector, Payload::Write(buf))
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("geometry", &self.geometry)
            .field("owner", &self.devices.owner())
            .finish_non_exhaustive()
    }
}
