//! Debug Adapter Protocol (DAP) wire format
//!
//! The adapter side of DAP: the IDE talks to us over stdio.

pub mod codec;
pub mod types;

pub use types::*;
