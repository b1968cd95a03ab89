//! livepad-core — wire types, protocol constants, and configuration.
//! All other LivePad crates depend on this one.

pub mod config;
pub mod dump;
pub mod net;
pub mod protocol;

pub use dump::{DumpType, DumpValue, ExecuteResponse, FieldMap, ResultPair};
