//! Helpers shared by the order pipeline crates.
pub mod helpers;
mod secret;

pub use helpers::{parse_boolean_flag, parse_bounded};
pub use secret::Secret;
