//! Error-context helpers and small utilities used across all parlor crates.

pub mod error;
pub mod time;

pub use error::FromMessage;
