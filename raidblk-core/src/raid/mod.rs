// vim: tw=80

//! raidblk RAID layer
//!
//! Aggregates 3 or 4 member devices into one logical device.  Logical sectors
//! are striped one at a time across all members but the last, which is
//! reserved for a future parity engine.  Every request is split into
//! single-sector sub-requests whose completions are folded back into one.

mod array;
mod completion;
mod devices;
mod geometry;
mod parity;
mod request;

pub use self::array::Array;
pub use self::completion::{Completion, CompletionGroup};
pub use self::devices::DeviceSet;
pub use self::geometry::{Geometry, Sectorloc};
pub use self::parity::{NullParity, ParityHook};
pub use self::request::{Direction, LogicalRequest, Payload, SubRequest};
