//! External analytics process execution.
//!
//! This module spawns the analytics scripts and recovers the JSON result
//! from whatever they print.

pub mod extract;
pub mod process;

pub use extract::{extract_record, extract_value};
pub use process::ProcessInvocation;
