//! Drivers for the supported register-file devices.
//!
//! Everything a typical consumer needs is re-exported at the crate root.

pub mod mcp23017;
