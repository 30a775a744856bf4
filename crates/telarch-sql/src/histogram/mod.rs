//! Histogram index.
//!
//! A histogram summarizes when each value of a column was present: samples
//! of the same value close in time are merged into intervals
//! `[start, stop]` with a sample count. Writers maintain it through a
//! [`HistogramBuilder`]; readers scan it with a [`HistogramIterator`].

mod builder;
mod interval;
mod iterator;
mod keyspace;

pub use builder::HistogramBuilder;
pub use interval::HistogramInterval;
pub use iterator::{HistogramIterator, IteratorState};
pub use keyspace::HistogramKeyspace;
