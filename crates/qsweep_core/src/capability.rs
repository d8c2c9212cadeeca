//! Capability traits
//!
//! Objects in the registry share behaviour through these small traits rather
//! than a type hierarchy. The executor only needs [`Sweepable`] and
//! [`Replicate`], so it can drive anything that can take parameter writes and
//! produce an independent copy of itself.

use crate::error::SimError;
use crate::model::{ObjectId, Value};
use crate::registry::{DependencyNode, Object};

/// Has a unique name and optional aliases
pub trait Nameable {
    fn name(&self) -> &str;
    fn aliases(&self) -> &[String];
}

/// Takes part in a tensor ordering
pub trait DimensionAware {
    /// `None` for objects without a dimension
    fn dimension(&self) -> Option<usize>;
    fn size_before(&self) -> Option<usize>;
    fn size_after(&self) -> Option<usize>;
}

/// Owns a lazily rebuilt artifact
pub trait Cacheable<A> {
    fn node(&self) -> &DependencyNode<A>;

    fn is_dirty(&self) -> bool {
        self.node().is_dirty()
    }

    fn cached(&self) -> Option<&A> {
        self.node().cached()
    }
}

/// Accepts parameter writes addressed by object and key
pub trait Sweepable {
    fn apply(&mut self, target: ObjectId, key: &str, value: &Value) -> Result<(), SimError>;
}

/// Produces an independent copy with no cached state, for use on a worker
pub trait Replicate {
    fn replicate(&self) -> Self;
}

impl<A> Nameable for Object<A> {
    fn name(&self) -> &str {
        Object::name(self)
    }

    fn aliases(&self) -> &[String] {
        Object::aliases(self)
    }
}

impl<A> DimensionAware for Object<A> {
    fn dimension(&self) -> Option<usize> {
        self.kind()
            .is_dimensional()
            .then(|| self.placement().size())
    }

    fn size_before(&self) -> Option<usize> {
        self.kind()
            .is_dimensional()
            .then(|| self.placement().size_before())
    }

    fn size_after(&self) -> Option<usize> {
        self.kind()
            .is_dimensional()
            .then(|| self.placement().size_after())
    }
}

impl<A> Cacheable<A> for Object<A> {
    fn node(&self) -> &DependencyNode<A> {
        Object::node(self)
    }
}
