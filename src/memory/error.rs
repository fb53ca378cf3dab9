// Tue Jan 13 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Out of bounds: {len} bytes at offset {offset} exceed a {capacity}-byte view")]
    OutOfBounds { offset: usize, len: usize, capacity: usize },
    #[error("Unsupported access width: {0} bytes")]
    UnsupportedWidth(usize),
    #[error("Read failed at offset {0}")]
    ReadFailed(usize),
    #[error("Write failed at offset {0}")]
    WriteFailed(usize),
}
