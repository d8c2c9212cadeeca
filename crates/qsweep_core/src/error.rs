use std::fmt;

use crate::model::{CellRef, ObjectId, Value};

/// Errors raised while validating sweep, execution or system configuration.
///
/// These are raised eagerly the first time the offending configuration is
/// queried and are never silently defaulted.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Axis has neither an explicit value list nor a complete min/max/step triple
    MissingValues { axis: String },
    /// Range description cannot produce a value sequence
    InvalidRange { axis: String, reason: &'static str },
    /// Axis resolved to an empty value sequence
    EmptyAxis { axis: String },
    /// Lockstep axes in one group disagree on their length
    LockstepLengthMismatch {
        group: usize,
        axis: String,
        expected: usize,
        found: usize,
    },
    /// Axis group refers to an axis that was never declared
    UnknownAxis { group: usize, axis: usize },
    /// Index space does not match the lengths of the axis groups it drives
    IndexSpaceMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    /// Flat index lies outside the index space
    PointOutOfRange { flat: usize, total: usize },
    /// Binding a cell would make its effective value depend on itself
    BindingCycle { cell: CellRef },
    /// Value cannot be used as a positive dimension
    InvalidSize { object: ObjectId, value: Value },
    /// Name or alias is already taken in the registry
    DuplicateName(String),
    /// Execution settings cannot be honoured
    InvalidExecution { reason: &'static str },
    /// Configuration document could not be parsed
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingValues { axis } => write!(
                f,
                "axis {axis} has neither an explicit value list nor a complete min/max/step range"
            ),
            ConfigError::InvalidRange { axis, reason } => {
                write!(f, "axis {axis} has an invalid range: {reason}")
            }
            ConfigError::EmptyAxis { axis } => write!(f, "axis {axis} has no values"),
            ConfigError::LockstepLengthMismatch {
                group,
                axis,
                expected,
                found,
            } => write!(
                f,
                "lockstep group {group}: axis {axis} has {found} values, expected {expected}"
            ),
            ConfigError::UnknownAxis { group, axis } => {
                write!(f, "axis group {group} refers to undeclared axis {axis}")
            }
            ConfigError::IndexSpaceMismatch { expected, found } => write!(
                f,
                "index space has sizes {found:?} but the axis groups have {expected:?}"
            ),
            ConfigError::PointOutOfRange { flat, total } => {
                write!(f, "point {flat} is outside a sweep of {total} points")
            }
            ConfigError::BindingCycle { cell } => {
                write!(f, "binding {cell} would create a cycle")
            }
            ConfigError::InvalidSize { object, value } => {
                write!(f, "{value} is not a valid dimension for object {object}")
            }
            ConfigError::DuplicateName(name) => write!(f, "name {name:?} is already registered"),
            ConfigError::InvalidExecution { reason } => {
                write!(f, "invalid execution settings: {reason}")
            }
            ConfigError::Parse(msg) => write!(f, "could not parse configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors related to registry lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    ObjectNotFound(ObjectId),
    NameNotFound(String),
    ParameterNotFound(CellRef),
    SeriesNotFound(String),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::ObjectNotFound(id) => write!(f, "object {id} not found"),
            LookupError::NameNotFound(name) => write!(f, "no object named {name:?}"),
            LookupError::ParameterNotFound(cell) => write!(f, "parameter {cell} not found"),
            LookupError::SeriesNotFound(name) => write!(f, "no result series named {name:?}"),
        }
    }
}

impl std::error::Error for LookupError {}

/// Errors from structural edits of composites
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    /// Target of a membership edit is not a composite
    NotAComposite(ObjectId),
    /// Object has no dimension and cannot take part in a tensor ordering
    NotDimensional(ObjectId),
    /// Composite sizes are the product of their members and cannot be set
    CompositeSizeIsDerived(ObjectId),
    AlreadyMember { leaf: ObjectId, parent: ObjectId },
    NotAMember { leaf: ObjectId, composite: ObjectId },
    /// Adding the leaf would make a composite contain itself
    ContainmentCycle { leaf: ObjectId, composite: ObjectId },
}

impl fmt::Display for StructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureError::NotAComposite(id) => write!(f, "object {id} is not a composite"),
            StructureError::NotDimensional(id) => write!(f, "object {id} has no dimension"),
            StructureError::CompositeSizeIsDerived(id) => {
                write!(f, "size of composite {id} is derived from its members")
            }
            StructureError::AlreadyMember { leaf, parent } => {
                write!(f, "object {leaf} is already a member of {parent}")
            }
            StructureError::NotAMember { leaf, composite } => {
                write!(f, "object {leaf} is not a member of {composite}")
            }
            StructureError::ContainmentCycle { leaf, composite } => {
                write!(f, "adding {leaf} to {composite} would make it contain itself")
            }
        }
    }
}

impl std::error::Error for StructureError {}

/// Errors raised while rebuilding a cached artifact
#[derive(Debug, Clone, PartialEq)]
pub enum RebuildError {
    /// The external rebuild function reported a failure
    Failed(String),
    /// Object was reached again while its own artifact was being rebuilt
    DependencyCycle(ObjectId),
    /// Object has no rebuild function registered
    NoRebuild(ObjectId),
    /// A parameter read inside a rebuild function failed
    Lookup(LookupError),
    /// A parameter exists but holds a value of the wrong kind
    WrongType { cell: CellRef, expected: &'static str },
}

impl RebuildError {
    pub fn failed(message: impl Into<String>) -> Self {
        RebuildError::Failed(message.into())
    }
}

impl fmt::Display for RebuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebuildError::Failed(msg) => write!(f, "rebuild failed: {msg}"),
            RebuildError::DependencyCycle(id) => {
                write!(f, "dependency cycle while rebuilding object {id}")
            }
            RebuildError::NoRebuild(id) => write!(f, "object {id} has no rebuild function"),
            RebuildError::Lookup(e) => write!(f, "{e}"),
            RebuildError::WrongType { cell, expected } => {
                write!(f, "parameter {cell} is not {expected}")
            }
        }
    }
}

impl std::error::Error for RebuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RebuildError::Lookup(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LookupError> for RebuildError {
    fn from(e: LookupError) -> Self {
        RebuildError::Lookup(e)
    }
}

/// Errors raised while collecting and reshaping sweep results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    /// Result arrived for a position other than the next expected one
    OutOfOrder { expected: usize, found: usize },
    /// A point did not report a series every other point reports
    MissingOutput { flat_index: usize, name: String },
    /// A point reported a series the first point did not
    UnexpectedOutput { flat_index: usize, name: String },
    /// Fewer points were collected than the index space holds
    Incomplete { expected: usize, found: usize },
    /// Item count does not match the product of the requested sizes
    ShapeMismatch { expected: usize, found: usize },
}

impl fmt::Display for AggregationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationError::OutOfOrder { expected, found } => {
                write!(f, "result for point {found} arrived, expected point {expected}")
            }
            AggregationError::MissingOutput { flat_index, name } => {
                write!(f, "point {flat_index} did not report {name:?}")
            }
            AggregationError::UnexpectedOutput { flat_index, name } => {
                write!(f, "point {flat_index} reported unknown series {name:?}")
            }
            AggregationError::Incomplete { expected, found } => {
                write!(f, "collected {found} of {expected} points")
            }
            AggregationError::ShapeMismatch { expected, found } => {
                write!(f, "shape holds {expected} items but {found} were given")
            }
        }
    }
}

impl std::error::Error for AggregationError {}

/// Top-level error for simulation runs
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    Config(ConfigError),
    Lookup(LookupError),
    Structure(StructureError),
    Rebuild(RebuildError),
    Aggregation(AggregationError),
    /// The per-point evaluation callback failed
    Evaluation(String),
    /// The worker pool could not be created
    WorkerPool(String),
}

impl SimError {
    pub fn evaluation(message: impl Into<String>) -> Self {
        SimError::Evaluation(message.into())
    }
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Config(e) => write!(f, "configuration error: {e}"),
            SimError::Lookup(e) => write!(f, "{e}"),
            SimError::Structure(e) => write!(f, "{e}"),
            SimError::Rebuild(e) => write!(f, "{e}"),
            SimError::Aggregation(e) => write!(f, "{e}"),
            SimError::Evaluation(msg) => write!(f, "evaluation failed: {msg}"),
            SimError::WorkerPool(msg) => write!(f, "could not start worker pool: {msg}"),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::Config(e) => Some(e),
            SimError::Lookup(e) => Some(e),
            SimError::Structure(e) => Some(e),
            SimError::Rebuild(e) => Some(e),
            SimError::Aggregation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for SimError {
    fn from(e: ConfigError) -> Self {
        SimError::Config(e)
    }
}

impl From<LookupError> for SimError {
    fn from(e: LookupError) -> Self {
        SimError::Lookup(e)
    }
}

impl From<StructureError> for SimError {
    fn from(e: StructureError) -> Self {
        SimError::Structure(e)
    }
}

impl From<RebuildError> for SimError {
    fn from(e: RebuildError) -> Self {
        SimError::Rebuild(e)
    }
}

impl From<AggregationError> for SimError {
    fn from(e: AggregationError) -> Self {
        SimError::Aggregation(e)
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
