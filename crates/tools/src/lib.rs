//! Small shared utilities for the parsing crates.

pub mod utf8;
