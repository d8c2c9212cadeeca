//! Result aggregation
//!
//! Point results are collected strictly in flat-index order into named
//! series, then reshaped into nested lists (or a dense grid) that mirror the
//! sweep's group structure.

mod grid;
mod nested;
mod results;

pub use grid::SweepGrid;
pub use nested::{Nested, flatten, reshape};
pub use results::{ResultAggregator, ResultSeries, SweepResults};
