//! CLI command handlers

pub mod consume;
pub mod partitions;
