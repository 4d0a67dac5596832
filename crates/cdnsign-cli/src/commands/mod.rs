//! CLI command implementations.

pub mod key;
pub mod serve;
pub mod sign;
