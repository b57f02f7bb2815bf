//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod clock;
pub mod hooks;
pub mod memory;
pub mod ports;
