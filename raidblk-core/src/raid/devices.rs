// vim: tw=80
//! The set of member devices owned by an array

use std::path::{Path, PathBuf};
use crate::{
    types::*,
    vdev::*,
};
use super::geometry::Geometry;

/// Exclusive handles to every member of an array, in array order.
///
/// Immutable once assembled, so it may be read from any number of in-flight
/// requests without locking.
pub struct DeviceSet {
    devices: Box<[Box<dyn BlockDevice>]>,
    /// The names used to open each device
    paths: Box<[PathBuf]>,
    owner: Owner,
}

impl DeviceSet {
    /// Open every member of a new array and validate their geometry.
    ///
    /// Devices are opened in order, all on behalf of `owner`.  Each one must be
    /// the same size as the first.  On any failure, every device opened so far
    /// is closed again before the error is returned.
    pub fn assemble<P>(opener: &dyn DeviceOpener, paths: &[P], owner: Owner)
        -> Result<(Self, Geometry)>
        where P: AsRef<Path>
    {
        if let Err(e) = Geometry::check_devices(paths.len()) {
            tracing::error!("{e}");
            return Err(e);
        }
        let paths = paths.iter()
            .map(|p| p.as_ref().to_path_buf())
            .collect::<Box<[_]>>();
        let mut devices = Vec::with_capacity(paths.len());
        for (index, path) in paths.iter().enumerate() {
            let device = match opener.open(path, owner) {
                Ok(d) => d,
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e,
                        "failed to open");
                    close(devices, &paths);
                    return Err(Error::DeviceOpenFailed {
                        path: path.clone(),
                        source: e.errno()
                    });
                }
            };
            let actual = device.sectors();
            tracing::info!(path = %path.display(), sectors = actual,
                "opened device");
            devices.push(device);
            let expected = devices[0].sectors();
            if actual != expected {
                tracing::error!(path = %path.display(), expected, actual,
                    "sector count doesn't match");
                close(devices, &paths);
                return Err(Error::GeometryMismatch{index, expected, actual});
            }
        }
        let geometry = Geometry::new(devices.len(), devices[0].sectors())?;
        let ds = DeviceSet {
            devices: devices.into_boxed_slice(),
            paths,
            owner
        };
        Ok((ds, geometry))
    }

    /// Close every device.
    pub fn close(self) {
        close(self.devices.into_vec(), &self.paths);
    }

    pub fn get(&self, index: usize) -> &dyn BlockDevice {
        &*self.devices[index]
    }

    /// Identity under which every member was opened
    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn path(&self, index: usize) -> &Path {
        &self.paths[index]
    }
}

/// Close devices in array order
fn close(devices: Vec<Box<dyn BlockDevice>>, paths: &[PathBuf]) {
    for (device, path) in devices.into_iter().zip(paths.iter()) {
        drop(device);
        tracing::debug!(path = %path.display(), "closed device");
    }
}

// LCOV_EXCL_STOP
