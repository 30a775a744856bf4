//! Type definitions shared across telarch.

mod interval;
mod keys;

pub use interval::TimeInterval;
pub use keys::{Key, Value};
