//! Tensor-order bookkeeping for composites.
//!
//! For a composite with members `L1..Ln` every member records the product of
//! the sizes before and after it:
//!
//! ```text
//! Li.size_before = size(L1) * .. * size(Li-1)
//! Li.size_after  = size(Li+1) * .. * size(Ln)
//! composite.size = Li.size_before * size(Li) * Li.size_after
//! ```
//!
//! Updates are incremental. A size change scales the neighbours by `new/old`
//! and cascades into the enclosing composite; membership changes multiply or
//! divide the neighbours by the member's size.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ObjectKind, Registry};
use crate::error::{ConfigError, LookupError, SimError, StructureError};
use crate::model::{ObjectId, Value};

/// Position of a dimensional object inside its enclosing composite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    size: usize,
    size_before: usize,
    size_after: usize,
    parent: Option<ObjectId>,
}

impl Placement {
    pub(crate) fn with_size(size: usize) -> Self {
        Self {
            size,
            size_before: 1,
            size_after: 1,
            parent: None,
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn size_before(&self) -> usize {
        self.size_before
    }

    #[must_use]
    pub fn size_after(&self) -> usize {
        self.size_after
    }

    #[must_use]
    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    fn detach(&mut self) {
        self.size_before = 1;
        self.size_after = 1;
        self.parent = None;
    }
}

impl<A> Registry<A> {
    fn placement_mut(&mut self, id: ObjectId) -> Result<&mut Placement, LookupError> {
        Ok(&mut self.object_mut(id)?.placement)
    }

    fn composite_members(&self, id: ObjectId) -> Result<Vec<ObjectId>, SimError> {
        match &self.object(id)?.kind {
            ObjectKind::Composite { members } => Ok(members.clone()),
            _ => Err(StructureError::NotAComposite(id).into()),
        }
    }

    /// True if `ancestor` is `id` or encloses it at any level
    fn encloses(&self, ancestor: ObjectId, id: ObjectId) -> Result<bool, LookupError> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return Ok(true);
            }
            cursor = self.object(current)?.placement.parent;
        }
        Ok(false)
    }

    /// Change the size of a leaf and keep every enclosing composite consistent
    pub fn set_leaf_size(&mut self, leaf: ObjectId, size: usize) -> Result<(), SimError> {
        match self.object(leaf)?.kind {
            ObjectKind::Leaf => {}
            ObjectKind::Composite { .. } => {
                return Err(StructureError::CompositeSizeIsDerived(leaf).into());
            }
            ObjectKind::Plain => return Err(StructureError::NotDimensional(leaf).into()),
        }
        if size == 0 {
            return Err(ConfigError::InvalidSize {
                object: leaf,
                value: Value::from(size),
            }
            .into());
        }
        self.rescale(leaf, size)?;
        Ok(())
    }

    /// Set `id`'s size to `new`, scale its siblings and cascade upwards.
    ///
    /// Every size involved is a product that contains `old` as a factor, so
    /// `x / old * new` stays exact.
    fn rescale(&mut self, id: ObjectId, new: usize) -> Result<(), LookupError> {
        let placement = self.placement_mut(id)?;
        let old = placement.size;
        if old == new {
            return Ok(());
        }
        placement.size = new;
        let parent = placement.parent;

        if let Some(parent) = parent {
            let members = self.object(parent)?.members().to_vec();
            let position = members.iter().position(|&m| m == id).unwrap_or(members.len());
            for (i, &member) in members.iter().enumerate() {
                let sibling = self.placement_mut(member)?;
                if i < position {
                    sibling.size_after = sibling.size_after / old * new;
                } else if i > position {
                    sibling.size_before = sibling.size_before / old * new;
                } else {
                    continue;
                }
                self.invalidate(member)?;
            }

            let parent_size = self.object(parent)?.placement.size;
            self.rescale(parent, parent_size / old * new)?;
        }

        debug!(object = %id, old, new, "rescaled");
        self.invalidate(id)
    }

    /// Insert a dimensional object into a composite.
    ///
    /// `position` is an index into the composite's member order; `None`
    /// appends. The composite becomes a dependent of the member and its cached
    /// artifact is cleared.
    pub fn add_leaf(
        &mut self,
        composite: ObjectId,
        leaf: ObjectId,
        position: Option<usize>,
    ) -> Result<(), SimError> {
        let members = self.composite_members(composite)?;
        let member = self.object(leaf)?;
        if !member.kind.is_dimensional() {
            return Err(StructureError::NotDimensional(leaf).into());
        }
        if let Some(parent) = member.placement.parent {
            return Err(StructureError::AlreadyMember { leaf, parent }.into());
        }
        if self.encloses(leaf, composite)? {
            return Err(StructureError::ContainmentCycle { leaf, composite }.into());
        }

        let size = member.placement.size;
        let position = position.unwrap_or(members.len()).min(members.len());

        let mut before = 1;
        let mut after = 1;
        for (i, &m) in members.iter().enumerate() {
            let sibling = self.placement_mut(m)?;
            if i < position {
                before *= sibling.size;
                sibling.size_after *= size;
            } else {
                after *= sibling.size;
                sibling.size_before *= size;
            }
        }

        let placement = self.placement_mut(leaf)?;
        placement.size_before = before;
        placement.size_after = after;
        placement.parent = Some(composite);

        if let ObjectKind::Composite { members } = &mut self.object_mut(composite)?.kind {
            members.insert(position, leaf);
        }

        let composite_size = self.object(composite)?.placement.size;
        self.rescale(composite, composite_size * size)?;

        self.register_dependent(leaf, composite)?;
        for m in members {
            self.invalidate(m)?;
        }
        self.clear_cache(composite)?;
        self.invalidate(leaf)?;
        debug!(composite = %composite, leaf = %leaf, position, "added member");
        Ok(())
    }

    /// Remove a member from a composite, the inverse of [`Registry::add_leaf`]
    pub fn remove_leaf(&mut self, composite: ObjectId, leaf: ObjectId) -> Result<(), SimError> {
        let members = self.composite_members(composite)?;
        let position = members
            .iter()
            .position(|&m| m == leaf)
            .ok_or(StructureError::NotAMember { leaf, composite })?;

        let size = self.object(leaf)?.placement.size;
        for (i, &m) in members.iter().enumerate() {
            let sibling = self.placement_mut(m)?;
            if i < position {
                sibling.size_after /= size;
            } else if i > position {
                sibling.size_before /= size;
            }
        }

        if let ObjectKind::Composite { members } = &mut self.object_mut(composite)?.kind {
            members.remove(position);
        }
        self.placement_mut(leaf)?.detach();

        let composite_size = self.object(composite)?.placement.size;
        self.rescale(composite, composite_size / size)?;

        self.unregister_dependent(leaf, composite)?;
        for m in members {
            self.invalidate(m)?;
        }
        self.clear_cache(composite)?;
        debug!(composite = %composite, leaf = %leaf, "removed member");
        Ok(())
    }
}
