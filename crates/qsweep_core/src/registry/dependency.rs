//! Lazily rebuilt cached artifacts and dirty-flag propagation.
//!
//! Every object owns a [`DependencyNode`]. Invalidating a node marks it and
//! everything downstream of it dirty; nothing is rebuilt until the artifact is
//! read again through [`Registry::artifact`].

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::{debug, trace, warn};

use super::{ParamView, Registry};
use crate::error::{LookupError, RebuildError, SimError};
use crate::model::ObjectId;

/// Rebuilds an object's artifact from its current parameters.
///
/// Implementations must be pure in the parameters they read. Closures of the
/// form `Fn(&ParamView<A>) -> Result<A, RebuildError>` implement this trait.
pub trait Rebuild<A>: Send + Sync {
    fn rebuild(&self, view: &ParamView<'_, A>) -> Result<A, RebuildError>;
}

impl<A, F> Rebuild<A> for F
where
    F: Fn(&ParamView<'_, A>) -> Result<A, RebuildError> + Send + Sync,
{
    fn rebuild(&self, view: &ParamView<'_, A>) -> Result<A, RebuildError> {
        self(view)
    }
}

/// Cache slot, dirty flag and downstream links of one object
pub struct DependencyNode<A> {
    cached: Option<A>,
    dirty: bool,
    dependents: BTreeSet<ObjectId>,
    rebuild: Option<Arc<dyn Rebuild<A>>>,
}

impl<A> Default for DependencyNode<A> {
    fn default() -> Self {
        Self {
            cached: None,
            dirty: true,
            dependents: BTreeSet::new(),
            rebuild: None,
        }
    }
}

impl<A> fmt::Debug for DependencyNode<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyNode")
            .field("cached", &self.cached.is_some())
            .field("dirty", &self.dirty)
            .field("dependents", &self.dependents)
            .field("rebuild", &self.rebuild.is_some())
            .finish()
    }
}

impl<A> DependencyNode<A> {
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn cached(&self) -> Option<&A> {
        self.cached.as_ref()
    }

    #[must_use]
    pub fn dependents(&self) -> &BTreeSet<ObjectId> {
        &self.dependents
    }

    #[must_use]
    pub fn has_rebuild(&self) -> bool {
        self.rebuild.is_some()
    }

    /// True when a read would return the cache without rebuilding
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        !self.dirty && self.cached.is_some()
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn clear_cache(&mut self) {
        self.cached = None;
        self.dirty = true;
    }

    pub(crate) fn store(&mut self, artifact: A) {
        self.cached = Some(artifact);
        self.dirty = false;
    }

    pub(crate) fn set_rebuild(&mut self, rebuild: Arc<dyn Rebuild<A>>) {
        self.rebuild = Some(rebuild);
        self.clear_cache();
    }

    pub(crate) fn insert_dependent(&mut self, id: ObjectId) -> bool {
        self.dependents.insert(id)
    }

    pub(crate) fn remove_dependent(&mut self, id: ObjectId) -> bool {
        self.dependents.remove(&id)
    }

    /// Structure-only copy: same links and rebuild function, no cache
    pub(crate) fn blank(&self) -> Self {
        Self {
            cached: None,
            dirty: true,
            dependents: self.dependents.clone(),
            rebuild: self.rebuild.clone(),
        }
    }
}

impl<A> Registry<A> {
    /// Attach a rebuild function to an object, discarding any cached artifact
    pub fn set_rebuild<F>(&mut self, id: ObjectId, rebuild: F) -> Result<(), LookupError>
    where
        F: Fn(&ParamView<'_, A>) -> Result<A, RebuildError> + Send + Sync + 'static,
    {
        self.set_rebuild_with(id, Arc::new(rebuild))
    }

    /// Attach a shared rebuild implementation to an object
    pub fn set_rebuild_with(
        &mut self,
        id: ObjectId,
        rebuild: Arc<dyn Rebuild<A>>,
    ) -> Result<(), LookupError> {
        self.object_mut(id)?.node.set_rebuild(rebuild);
        self.invalidate(id)
    }

    /// Make `dependent` follow `upstream`: whenever `upstream` is invalidated,
    /// so is `dependent`. Does not itself invalidate anything.
    pub fn register_dependent(
        &mut self,
        upstream: ObjectId,
        dependent: ObjectId,
    ) -> Result<bool, LookupError> {
        self.object(dependent)?;
        Ok(self.object_mut(upstream)?.node.insert_dependent(dependent))
    }

    /// Remove a dependent link. Does not itself invalidate anything.
    pub fn unregister_dependent(
        &mut self,
        upstream: ObjectId,
        dependent: ObjectId,
    ) -> Result<bool, LookupError> {
        Ok(self.object_mut(upstream)?.node.remove_dependent(dependent))
    }

    /// Objects that list `id` among their dependents
    #[must_use]
    pub fn upstream_of(&self, id: ObjectId) -> Vec<ObjectId> {
        self.iter()
            .filter(|(_, object)| object.node.dependents().contains(&id))
            .map(|(upstream, _)| upstream)
            .collect()
    }

    /// Mark `id` and everything reachable through dependent links dirty.
    ///
    /// Breadth-first, each node visited once per call, so dependency cycles
    /// terminate. Already-dirty nodes still forward to their dependents: a
    /// dependent registered after an earlier invalidation has not seen it.
    pub fn invalidate(&mut self, id: ObjectId) -> Result<(), LookupError> {
        self.object(id)?;

        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::from([id]);
        while let Some(next) = queue.pop_front() {
            if !visited.insert(next) {
                continue;
            }
            if let Some(object) = self.objects.get_mut(next.index()) {
                object.node.mark_dirty();
                queue.extend(object.node.dependents().iter().copied());
            }
        }

        debug!(object = %id, reached = visited.len(), "invalidated");
        Ok(())
    }

    /// Drop the cached artifact of an object (structural change) and
    /// invalidate everything downstream of it
    pub fn clear_cache(&mut self, id: ObjectId) -> Result<(), LookupError> {
        self.object_mut(id)?.node.clear_cache();
        self.invalidate(id)
    }

    /// Read an object's artifact, rebuilding it first if it is dirty.
    ///
    /// Upstream objects that carry a rebuild function are refreshed before
    /// the object itself, so the rebuild function can read their artifacts
    /// through [`ParamView::upstream_artifact`]. On failure the object stays
    /// dirty and the error is returned.
    pub fn artifact(&mut self, id: ObjectId) -> Result<&A, SimError> {
        let mut building = FxHashSet::default();
        self.refresh(id, &mut building)?;
        self.object(id)?
            .node
            .cached()
            .ok_or_else(|| RebuildError::NoRebuild(id).into())
    }

    fn refresh(
        &mut self,
        id: ObjectId,
        building: &mut FxHashSet<ObjectId>,
    ) -> Result<(), SimError> {
        if self.object(id)?.node.is_fresh() {
            return Ok(());
        }
        if !building.insert(id) {
            return Err(RebuildError::DependencyCycle(id).into());
        }

        for upstream in self.upstream_of(id) {
            if self.object(upstream)?.node.has_rebuild() {
                self.refresh(upstream, building)?;
            }
        }

        let rebuild = self
            .object(id)?
            .node
            .rebuild
            .clone()
            .ok_or(RebuildError::NoRebuild(id))?;

        trace!(object = %id, "rebuilding artifact");
        let outcome = rebuild.rebuild(&ParamView::new(self, id));
        building.remove(&id);

        match outcome {
            Ok(artifact) => {
                self.object_mut(id)?.node.store(artifact);
                Ok(())
            }
            Err(e) => {
                warn!(object = %id, error = %e, "rebuild failed, object stays dirty");
                Err(e.into())
            }
        }
    }
}
