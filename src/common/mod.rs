//! Common utilities shared between the adapter and the CLI subcommands

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};
