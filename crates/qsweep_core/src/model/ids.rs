//! Unique identifiers for registry entities
//!
//! Objects never hold references to each other. Every cross-object link
//! (composite membership, dependents, bound parameter cells) is expressed
//! through one of these handles and resolved against the owning registry.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Handle of an object stored in a [`Registry`](crate::registry::Registry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// Position of the object in the registry arena
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Address of a single parameter cell: owning object plus attribute key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub object: ObjectId,
    pub key: String,
}

impl CellRef {
    pub fn new(object: ObjectId, key: impl Into<String>) -> Self {
        Self {
            object,
            key: key.into(),
        }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.object, self.key)
    }
}
