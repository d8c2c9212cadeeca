//! Parameter sweeps over composed quantum systems
//!
//! This crate provides the engine for describing a system as a graph of
//! simulated objects and sweeping its parameters. It supports:
//! - Parameter cells that can mirror another object's parameter
//! - Lazily rebuilt cached artifacts with dirty-flag propagation
//! - Tensor-order size bookkeeping for nested composites
//! - Multi-parameter sweeps with lockstep groups, addressed by a flat index
//! - Sequential or parallel execution (rayon, `parallel` feature)
//! - Results reshaped into nested lists mirroring the sweep structure
//!
//! # Example
//!
//! ```ignore
//! use qsweep_core::{ExecutionConfig, Simulation, SweepAxis, SystemBuilder, scalar};
//!
//! let registry = SystemBuilder::new()
//!     .leaf("qubit", 2)
//!     .leaf("cavity", 10)
//!     .composite("system", ["qubit", "cavity"])
//!     .param("qubit", "frequency", 5.0)
//!     .rebuild("qubit", |view| view.f64("frequency"))
//!     .build()?;
//!
//! let qubit = registry.lookup("qubit")?;
//! let cavity = registry.lookup("cavity")?;
//! let mut simulation = Simulation::new(registry);
//! simulation.add_axis(SweepAxis::range(qubit, "frequency", 4.0, 6.0, 0.5))?;
//! simulation.add_axis(SweepAxis::new(cavity, "dimension", vec![5.into(), 10.into()]))?;
//! simulation.set_execution(ExecutionConfig::parallel(4))?;
//!
//! let results = simulation.run(|registry, _point| {
//!     let qubit = registry.lookup("qubit")?;
//!     Ok(scalar("energy", *registry.artifact(qubit)?))
//! })?;
//! let energy = results.nested("energy")?; // energy[cavity][qubit]
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod aggregate;
pub mod capability;
pub mod error;
pub mod executor;
pub mod registry;
pub mod simulation;
pub mod sweep;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use aggregate::{Nested, ResultSeries, SweepGrid, SweepResults};
pub use capability::{Cacheable, DimensionAware, Nameable, Replicate, Sweepable};
pub use config::{AxisSpec, ExecutionConfig, ExecutionMode, SweepSpec, SystemBuilder};
pub use error::{Result, SimError};
pub use executor::{PointOutputs, PointResult, SweepPoint, SweepProgress};
pub use model::{CellRef, ObjectId, Value};
pub use registry::{DIMENSION_KEY, ParamView, Registry};
pub use simulation::{Simulation, scalar};
pub use sweep::{Scale, SweepAxis, SweepIndexSpace};
