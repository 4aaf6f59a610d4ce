//! Data models for the fleet quote desk.
//!
//! Field names serialize in camelCase to match the browser client.

mod quote;
mod report;
mod settings;
mod snapshot;
mod supplier;

pub use quote::*;
pub use report::*;
pub use settings::*;
pub use snapshot::*;
pub use supplier::*;
