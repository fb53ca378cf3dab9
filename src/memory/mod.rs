// Tue Jan 13 2026 - Alex

pub mod address;
pub mod buffer;
pub mod error;
pub mod traits;

pub use address::Address;
pub use buffer::BufferView;
pub use error::MemoryError;
pub use traits::TypedMemoryView;
