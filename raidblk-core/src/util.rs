// vim: tw=80
//! Common utility functions used throughout raidblk

use std::ops::{Add, Div, Sub};

/// Sectors are always 512 bytes, the traditional disk sector size.
pub const BYTES_PER_SECTOR: usize = 512;

/// Divide two unsigned numbers (usually integers), rounding up.
pub fn div_roundup<T>(dividend: T, divisor: T) -> T
    where T: Add<Output=T> + Copy + Div<Output=T> + From<u8> + Sub<Output=T>
{
    (dividend + divisor - T::from(1u8)) / divisor
}

// LCOV_EXCL_STOP
