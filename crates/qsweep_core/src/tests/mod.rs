//! Integration tests for the sweep engine
//!
//! Tests are organized by topic:
//! - `cells` - Parameter bindings, direct writes and their invalidation
//! - `invalidation` - Dirty-flag propagation and lazy rebuilds
//! - `sizes` - Tensor-order bookkeeping under random edits
//! - `sweep` - Axis grouping, index space and flat-index addressing
//! - `execution` - Sequential and parallel runs over a real registry
//! - `reshape` - Nested result shapes

mod cells;
