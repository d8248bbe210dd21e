//! Repository implementations

pub mod memory;

pub use memory::{InMemoryGraphRepository, InMemoryUserRepository};
