//! Small shared helpers used across the fieldmapper crates

pub mod util;

pub use util::*;
