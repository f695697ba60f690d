// vim: tw=80
//! Array configuration

use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf}
};
use serde_derive::{Deserialize, Serialize};
use crate::types::*;

/// Everything needed to assemble an array.
///
/// It may be built in code or loaded from a YAML file like this:
///
/// ```yaml
/// devices:
///   - /dev/ada1
///   - /dev/ada2
///   - /dev/ada3
/// max_split_subrequests: 256
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ArrayConfig {
    /// Member devices, in array order.  The last one is reserved for parity.
    pub devices: Vec<PathBuf>,

    /// Maximum number of split-off sub-requests that may be in flight at
    /// once, across all requests.  Unlimited if unset.
    #[serde(default)]
    pub max_split_subrequests: Option<NonZeroUsize>,
}

impl ArrayConfig {
    pub fn new<P: AsRef<Path>>(devices: &[P]) -> Self {
        let devices = devices.iter()
            .map(|p| p.as_ref().to_path_buf())
            .collect();
        ArrayConfig { devices, max_split_subrequests: None }
    }

    /// Load a configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path).map_err(|e| {
            Error::BadConfigFile(format!("{}: {e}", path.display()))
        })?;
        Self::from_yaml(&s)
    }

    pub fn from_yaml(s: &str) -> Result<Self> {
        serde_yaml_ng::from_str(s)
            .map_err(|e| Error::BadConfigFile(e.to_string()))
    }

    pub fn max_split_subrequests(mut self, n: Option<NonZeroUsize>) -> Self {
        self.max_split_subrequests = n;
        self
    }
}

// LCOV_EXCL_STOP
