//! Read-only parameter access handed to rebuild functions

use super::Registry;
use crate::error::{LookupError, RebuildError};
use crate::model::{CellRef, ObjectId, Value};

/// Read-only view of one object's parameters and placement.
///
/// Passed to [`Rebuild`](super::Rebuild) implementations. Reads resolve
/// bindings exactly like [`Registry::read`].
pub struct ParamView<'a, A> {
    registry: &'a Registry<A>,
    id: ObjectId,
}

impl<'a, A> ParamView<'a, A> {
    pub(crate) fn new(registry: &'a Registry<A>, id: ObjectId) -> Self {
        Self { registry, id }
    }

    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &'a str {
        self.registry.name(self.id).unwrap_or_default()
    }

    /// View of another object, e.g. a member of the composite being rebuilt
    pub fn of(&self, id: ObjectId) -> Result<ParamView<'a, A>, RebuildError> {
        self.registry.object(id)?;
        Ok(ParamView::new(self.registry, id))
    }

    /// Effective value of a parameter
    pub fn get(&self, key: &str) -> Result<&'a Value, RebuildError> {
        Ok(self.registry.read(self.id, key)?)
    }

    pub fn f64(&self, key: &str) -> Result<f64, RebuildError> {
        self.get(key)?.as_f64().ok_or_else(|| self.wrong_type(key, "a number"))
    }

    pub fn int(&self, key: &str) -> Result<i64, RebuildError> {
        self.get(key)?.as_i64().ok_or_else(|| self.wrong_type(key, "an integer"))
    }

    pub fn bool(&self, key: &str) -> Result<bool, RebuildError> {
        self.get(key)?.as_bool().ok_or_else(|| self.wrong_type(key, "a boolean"))
    }

    pub fn text(&self, key: &str) -> Result<&'a str, RebuildError> {
        self.get(key)?.as_str().ok_or_else(|| self.wrong_type(key, "text"))
    }

    /// Numeric parameter with a fallback when it is not set anywhere
    pub fn f64_or(&self, key: &str, default: f64) -> Result<f64, RebuildError> {
        match self.f64(key) {
            Err(RebuildError::Lookup(LookupError::ParameterNotFound(_))) => Ok(default),
            other => other,
        }
    }

    fn wrong_type(&self, key: &str, expected: &'static str) -> RebuildError {
        RebuildError::WrongType {
            cell: CellRef::new(self.id, key),
            expected,
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.placement().map_or(1, |p| p.size())
    }

    #[must_use]
    pub fn size_before(&self) -> usize {
        self.placement().map_or(1, |p| p.size_before())
    }

    #[must_use]
    pub fn size_after(&self) -> usize {
        self.placement().map_or(1, |p| p.size_after())
    }

    fn placement(&self) -> Option<&'a super::Placement> {
        self.registry.object(self.id).ok().map(|o| o.placement())
    }

    /// Members in tensor order; empty unless the object is a composite
    #[must_use]
    pub fn members(&self) -> &'a [ObjectId] {
        self.registry
            .object(self.id)
            .map(|o| o.members())
            .unwrap_or(&[])
    }

    /// Cached artifact of another object.
    ///
    /// Objects that list this one as a dependent are refreshed before the
    /// rebuild runs, so their artifacts are current here.
    pub fn upstream_artifact(&self, id: ObjectId) -> Result<&'a A, RebuildError> {
        self.registry
            .object(id)?
            .node()
            .cached()
            .ok_or(RebuildError::NoRebuild(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_reads() {
        let mut registry: Registry<()> = Registry::new();
        let q = registry.create_leaf("q", 3).unwrap();
        registry.write(q, "frequency", 5.5).unwrap();
        registry.write(q, "levels", 3).unwrap();
        registry.write(q, "label", "transmon").unwrap();

        let view = ParamView::new(&registry, q);
        assert_eq!(view.name(), "q");
        assert_eq!(view.f64("frequency").unwrap(), 5.5);
        assert_eq!(view.f64("levels").unwrap(), 3.0);
        assert_eq!(view.int("levels").unwrap(), 3);
        assert_eq!(view.text("label").unwrap(), "transmon");
        assert_eq!(view.f64_or("anharmonicity", -0.3).unwrap(), -0.3);
        assert_eq!(view.size(), 3);
        assert_eq!(
            view.bool("label"),
            Err(RebuildError::WrongType {
                cell: CellRef::new(q, "label"),
                expected: "a boolean"
            })
        );
    }

    #[test]
    fn test_upstream_artifact_feeds_composite_rebuild() {
        let mut registry: Registry<f64> = Registry::new();
        let system = registry.create_composite("system").unwrap();
        let a = registry.create_leaf("a", 2).unwrap();
        let b = registry.create_leaf("b", 3).unwrap();
        registry.add_leaf(system, a, None).unwrap();
        registry.add_leaf(system, b, None).unwrap();
        for leaf in [a, b] {
            registry.write(leaf, "energy", 1.5).unwrap();
            registry.set_rebuild(leaf, |view| view.f64("energy")).unwrap();
        }
        registry
            .set_rebuild(system, |view| {
                view.members()
                    .iter()
                    .map(|&m| view.upstream_artifact(m).copied())
                    .sum()
            })
            .unwrap();

        assert_eq!(*registry.artifact(system).unwrap(), 3.0);
        registry.write(b, "energy", 4.0).unwrap();
        assert_eq!(*registry.artifact(system).unwrap(), 5.5);
    }
}
