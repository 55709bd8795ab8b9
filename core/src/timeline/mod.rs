//! Active-time bookkeeping for DPS math
//!
//! A [`TimeRange`] holds sorted, non-overlapping [`TimeSegment`]s. Segments are
//! closed intervals measured in whole seconds, so a single-tick segment counts
//! as one second of activity.

mod time_range;

#[cfg(test)]
mod time_range_tests;

pub use time_range::{GAP_BRIDGE_SECONDS, TimeRange, TimeSegment};
