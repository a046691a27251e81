// Adapters layer: concrete match stores and player directories.

pub mod http;
pub mod local;
pub mod memory;

pub use http::{HttpMatchStore, HttpPlayerDirectory};
pub use local::LocalMatchStore;
pub use memory::{MemoryMatchStore, MemoryPlayerDirectory};
