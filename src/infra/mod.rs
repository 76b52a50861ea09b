//! Infrastructure adapters for the domain contracts.

pub mod hasher;
pub mod memory_store;

pub use hasher::Argon2Hasher;
pub use memory_store::MemoryUserStore;
