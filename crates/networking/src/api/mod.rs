//! High-level API wrappers
//!
//! This module turns raw backend responses into typed snapshots and adds
//! validation around the state-changing fixture calls.

mod fetch;
mod wallet;

pub use fetch::*;
pub use wallet::*;
