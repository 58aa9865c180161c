//! Shared helpers used across all portico crates.

pub mod error;

pub use error::FromMessage;
