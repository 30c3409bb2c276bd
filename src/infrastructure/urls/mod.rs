//! Object URL store adapters

mod memory;
mod spool;

pub use memory::MemoryUrlStore;
pub use spool::SpoolUrlStore;
