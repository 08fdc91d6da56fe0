//! Plain data types shared by every layer: orders, package rules and request payloads.

pub mod order;
pub mod package;

pub use order::*;
pub use package::*;
