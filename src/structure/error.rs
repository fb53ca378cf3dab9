// Tue Jan 13 2026 - Alex

use crate::memory::{Address, MemoryError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Unknown struct type: {0}")]
    UnknownStruct(String),
    #[error("Struct {0} embeds itself by value")]
    RecursiveEmbedding(String),
    #[error("Fields {first} and {second} overlap in {owner}")]
    Overlap { owner: String, first: String, second: String },
    #[error("Bit-field {field} is {bits} bits wide but its backing word holds {capacity}")]
    BitfieldTooWide { field: String, bits: u32, capacity: u32 },
    #[error("Invalid bit-field {0}: only integral fields can carry a bit width, and it must be non-zero")]
    InvalidBitfield(String),
    #[error("Invalid alignment {alignment} on {owner}: must be a power of two")]
    InvalidAlignment { owner: String, alignment: usize },
    #[error("Unsatisfiable alignment on {owner}: {reason}")]
    UnsatisfiableAlignment { owner: String, reason: String },
    #[error("Invalid field {field} in {owner}: {reason}")]
    InvalidField { owner: String, field: String, reason: String },
    #[error("Struct {0} is already laid out from a different descriptor")]
    DescriptorConflict(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarshalError {
    #[error("Memory access failed: {0}")]
    Memory(#[from] MemoryError),
    #[error("Field not found: {0}")]
    FieldNotFound(String),
    #[error("Field {field} is declared as {expected} but was given {found}")]
    KindMismatch { field: String, expected: String, found: String },
    #[error("Access of {len} bytes at offset {offset} exceeds struct size {size}")]
    OutOfBounds { offset: usize, len: usize, size: usize },
    #[error("Array field {field} holds {expected} elements, got {found}")]
    ArrayLength { field: String, expected: usize, found: usize },
    #[error("Index {index} out of range for array field {field} of length {len}")]
    IndexOutOfRange { field: String, index: usize, len: usize },
    #[error("Value {value:#x} of field {field} does not fit the requested type")]
    ValueOutOfRange { field: String, value: u64 },
    #[error("Error while marshaling struct {struct_name} ({instance}): {source}")]
    Struct {
        struct_name: String,
        instance: Address,
        #[source]
        source: Box<MarshalError>,
    },
}

impl MarshalError {
    /// Strips the struct context wrappers and returns the failure that started it.
    pub fn root_cause(&self) -> &MarshalError {
        match self {
            MarshalError::Struct { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
