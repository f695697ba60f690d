// vim: tw=80

// I don't find this lint very helpful
#![allow(clippy::type_complexity)]

pub mod config;
pub mod raid;
pub mod types;
pub mod util;
pub mod vdev;
pub mod vdev_file;

pub use crate::types::*;
pub use crate::util::*;
