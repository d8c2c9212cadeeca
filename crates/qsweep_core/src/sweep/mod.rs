//! Multi-parameter sweep description
//!
//! Axes name a parameter cell and the values it takes. Axes are partitioned
//! into groups; each group spans one dimension of the sweep and the
//! [`SweepIndexSpace`] addresses every combination with a single flat index.

mod axis;
mod index_space;

pub use axis::{AxisGroup, MAX_AXIS_POINTS, Scale, SweepAxis, ValueSource, group_axes};
pub use index_space::{SweepIndexSpace, compose, decompose};
