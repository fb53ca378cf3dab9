// Tue Jan 13 2026 - Alex

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// A native address as stored in a pointer-typed struct field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address {
    value: u64,
}

impl Address {
    pub fn new(value: u64) -> Self {
        Self { value }
    }

    pub fn null() -> Self {
        Self { value: 0 }
    }

    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self { value: ptr as usize as u64 }
    }

    pub fn as_u64(&self) -> u64 {
        self.value
    }

    pub fn is_null(&self) -> bool {
        self.value == 0
    }

    /// Drops the bits that do not fit into a pointer of `width` bytes.
    pub fn truncate(&self, width: usize) -> Self {
        if width >= 8 {
            return *self;
        }
        Self { value: self.value & ((1u64 << (width * 8)) - 1) }
    }

    pub fn checked_offset(&self, offset: usize) -> Option<Self> {
        self.value.checked_add(offset as u64).map(Self::new)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.value)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.value, f)
    }
}

impl fmt::UpperHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.value, f)
    }
}

impl Add<u64> for Address {
    type Output = Self;
    fn add(self, rhs: u64) -> Self::Output {
        Self { value: self.value.wrapping_add(rhs) }
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<Address> for u64 {
    fn from(addr: Address) -> Self {
        addr.value
    }
}
