// Fri Jan 16 2026 - Alex

mod access;
pub mod codec;
pub mod io;
pub mod value;

pub use io::StructIO;
pub use value::{StructValue, Value};
