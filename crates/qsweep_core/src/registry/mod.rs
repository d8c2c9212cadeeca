//! Object registry
//!
//! Every simulated object (leaf systems, composites, terms, couplings and the
//! simulation-wide settings holder) lives in one arena owned by the
//! simulation. Objects refer to each other only through [`ObjectId`] handles.
//!
//! The registry carries three concerns, split across submodules:
//! - [`cell`]: parameter cells and their bindings
//! - [`dependency`]: cached artifacts and invalidation
//! - [`sizes`]: tensor-order placement of leaves inside composites

pub mod cell;
pub mod dependency;
pub mod sizes;
pub mod view;

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

pub use cell::{Binding, ParameterCell};
pub use dependency::{DependencyNode, Rebuild};
pub use sizes::Placement;
pub use view::ParamView;

use crate::capability::{Replicate, Sweepable};
use crate::error::{ConfigError, LookupError, SimError, StructureError};
use crate::model::{CellRef, ObjectId, Value};

/// Reserved parameter key that addresses a leaf's dimension.
///
/// Writes to it are routed through the size tracker instead of a cell.
pub const DIMENSION_KEY: &str = "dimension";

/// Structural role of an object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    /// Dimensional object with a directly settable size
    Leaf,
    /// Ordered tensor product of dimensional members
    Composite { members: Vec<ObjectId> },
    /// Parameter holder without a dimension (terms, couplings, settings)
    Plain,
}

impl ObjectKind {
    #[must_use]
    pub fn is_dimensional(&self) -> bool {
        !matches!(self, ObjectKind::Plain)
    }
}

/// One entry of the registry arena
#[derive(Debug)]
pub struct Object<A> {
    name: String,
    aliases: Vec<String>,
    kind: ObjectKind,
    placement: Placement,
    params: BTreeMap<String, ParameterCell>,
    pub(crate) node: DependencyNode<A>,
}

impl<A> Object<A> {
    fn new(name: String, kind: ObjectKind, size: usize) -> Self {
        Self {
            name,
            aliases: Vec::new(),
            kind,
            placement: Placement::with_size(size),
            params: BTreeMap::new(),
            node: DependencyNode::default(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    #[must_use]
    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    #[must_use]
    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    #[must_use]
    pub fn node(&self) -> &DependencyNode<A> {
        &self.node
    }

    /// Members in tensor order; empty for anything but a composite
    #[must_use]
    pub fn members(&self) -> &[ObjectId] {
        match &self.kind {
            ObjectKind::Composite { members } => members,
            _ => &[],
        }
    }

    #[must_use]
    pub fn cell(&self, key: &str) -> Option<&ParameterCell> {
        self.params.get(key)
    }

    /// Parameter keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }
}

/// Saved state of one swept parameter, restored after a run
#[derive(Debug, Clone)]
pub(crate) enum CellSnapshot {
    Cell {
        cell: CellRef,
        saved: Option<ParameterCell>,
    },
    Dimension {
        object: ObjectId,
        size: usize,
    },
}

/// Arena of simulated objects addressed by [`ObjectId`]
#[derive(Debug)]
pub struct Registry<A> {
    objects: Vec<Object<A>>,
    names: FxHashMap<String, ObjectId>,
    /// Binding target -> cells currently bound to it
    mirrors: FxHashMap<CellRef, Vec<CellRef>>,
}

impl<A> Default for Registry<A> {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            names: FxHashMap::default(),
            mirrors: FxHashMap::default(),
        }
    }
}

impl<A> Registry<A> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate over all objects with their handles, in creation order
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &Object<A>)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, object)| (ObjectId(i as u32), object))
    }

    pub fn object(&self, id: ObjectId) -> Result<&Object<A>, LookupError> {
        self.objects
            .get(id.index())
            .ok_or(LookupError::ObjectNotFound(id))
    }

    pub(crate) fn object_mut(&mut self, id: ObjectId) -> Result<&mut Object<A>, LookupError> {
        self.objects
            .get_mut(id.index())
            .ok_or(LookupError::ObjectNotFound(id))
    }

    // ========================================================================
    // Creation and naming
    // ========================================================================

    fn insert(&mut self, name: &str, kind: ObjectKind, size: usize) -> Result<ObjectId, ConfigError> {
        if self.names.contains_key(name) {
            return Err(ConfigError::DuplicateName(name.to_string()));
        }
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(Object::new(name.to_string(), kind, size));
        self.names.insert(name.to_string(), id);
        debug!(object = %id, name, "registered object");
        Ok(id)
    }

    /// Create a dimensional leaf with the given size
    pub fn create_leaf(&mut self, name: &str, size: usize) -> Result<ObjectId, ConfigError> {
        if size == 0 {
            return Err(ConfigError::InvalidSize {
                object: ObjectId(self.objects.len() as u32),
                value: Value::from(size),
            });
        }
        self.insert(name, ObjectKind::Leaf, size)
    }

    /// Create an empty composite (size 1 until members are added)
    pub fn create_composite(&mut self, name: &str) -> Result<ObjectId, ConfigError> {
        self.insert(name, ObjectKind::Composite { members: Vec::new() }, 1)
    }

    /// Create a parameter holder without a dimension
    pub fn create_plain(&mut self, name: &str) -> Result<ObjectId, ConfigError> {
        self.insert(name, ObjectKind::Plain, 1)
    }

    /// Register an additional name for an existing object
    pub fn add_alias(&mut self, id: ObjectId, alias: &str) -> Result<(), SimError> {
        self.object(id)?;
        if self.names.contains_key(alias) {
            return Err(ConfigError::DuplicateName(alias.to_string()).into());
        }
        self.names.insert(alias.to_string(), id);
        self.object_mut(id)?.aliases.push(alias.to_string());
        Ok(())
    }

    /// Resolve a name or alias to its handle
    pub fn lookup(&self, name: &str) -> Result<ObjectId, LookupError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| LookupError::NameNotFound(name.to_string()))
    }

    pub fn name(&self, id: ObjectId) -> Result<&str, LookupError> {
        self.object(id).map(Object::name)
    }

    #[must_use]
    pub fn aliases(&self, id: ObjectId) -> &[String] {
        self.objects
            .get(id.index())
            .map(Object::aliases)
            .unwrap_or(&[])
    }

    // ========================================================================
    // Parameter cells
    // ========================================================================

    #[must_use]
    pub fn cell(&self, id: ObjectId, key: &str) -> Option<&ParameterCell> {
        self.objects.get(id.index())?.cell(key)
    }

    /// The cell whose local value is the effective value of `(id, key)`.
    ///
    /// Follows bindings until a cell that is not bound, or whose target cell
    /// does not exist.
    pub fn resolve(&self, id: ObjectId, key: &str) -> Result<CellRef, LookupError> {
        let start = CellRef::new(id, key);
        let mut current = self
            .cell(id, key)
            .map(|_| start.clone())
            .ok_or_else(|| self.missing(&start))?;

        // Bindings are acyclic (checked in `bind`), so this terminates.
        while let Some(target) = self
            .cell(current.object, &current.key)
            .and_then(ParameterCell::bound_to)
        {
            if self.cell(target.object, &target.key).is_none() {
                break;
            }
            current = target.clone();
        }
        Ok(current)
    }

    /// Effective value of a parameter
    pub fn read(&self, id: ObjectId, key: &str) -> Result<&Value, LookupError> {
        let source = self.resolve(id, key)?;
        self.cell(source.object, &source.key)
            .and_then(ParameterCell::local)
            .ok_or(LookupError::ParameterNotFound(CellRef::new(id, key)))
    }

    fn missing(&self, cell: &CellRef) -> LookupError {
        if self.objects.get(cell.object.index()).is_none() {
            LookupError::ObjectNotFound(cell.object)
        } else {
            LookupError::ParameterNotFound(cell.clone())
        }
    }

    /// Write a parameter directly.
    ///
    /// Creates the cell if needed, breaks any binding it had, and invalidates
    /// its owner plus the owners of every cell that mirrors it. The reserved
    /// [`DIMENSION_KEY`] resizes a leaf instead.
    pub fn write(&mut self, id: ObjectId, key: &str, value: impl Into<Value>) -> Result<(), SimError> {
        let value = value.into();
        if key == DIMENSION_KEY {
            return self.write_dimension(id, value);
        }

        let cell = CellRef::new(id, key);
        self.object(id)?;
        self.unlink(&cell);
        self.object_mut(id)?
            .params
            .entry(key.to_string())
            .or_default()
            .store(value);
        self.invalidate_readers(&cell)?;
        Ok(())
    }

    fn write_dimension(&mut self, id: ObjectId, value: Value) -> Result<(), SimError> {
        match self.object(id)?.kind {
            ObjectKind::Leaf => {
                let size = value
                    .as_size()
                    .ok_or(ConfigError::InvalidSize { object: id, value })?;
                self.set_leaf_size(id, size)
            }
            ObjectKind::Composite { .. } => Err(StructureError::CompositeSizeIsDerived(id).into()),
            ObjectKind::Plain => Err(StructureError::NotDimensional(id).into()),
        }
    }

    /// Make `(id, key)` mirror `target`.
    ///
    /// The target cell does not have to exist yet; until it does, reads fall
    /// back to the local value. Binding into a cycle is rejected.
    pub fn bind(&mut self, id: ObjectId, key: &str, target: CellRef) -> Result<(), SimError> {
        self.object(id)?;
        self.object(target.object)?;

        let cell = CellRef::new(id, key);
        let mut cursor = Some(target.clone());
        while let Some(next) = cursor {
            if next == cell {
                return Err(ConfigError::BindingCycle { cell }.into());
            }
            cursor = self.cell(next.object, &next.key).and_then(|c| c.bound_to().cloned());
        }

        self.unlink(&cell);
        self.object_mut(id)?
            .params
            .entry(key.to_string())
            .or_default()
            .bind(target.clone());
        self.mirrors.entry(target).or_default().push(cell.clone());
        self.invalidate_readers(&cell)?;
        Ok(())
    }

    /// Drop `cell` from the mirror index of its current binding target
    fn unlink(&mut self, cell: &CellRef) {
        let Some(target) = self
            .cell(cell.object, &cell.key)
            .and_then(ParameterCell::bound_to)
            .cloned()
        else {
            return;
        };
        if let Some(readers) = self.mirrors.get_mut(&target) {
            readers.retain(|reader| reader != cell);
            if readers.is_empty() {
                self.mirrors.remove(&target);
            }
        }
    }

    /// Cells whose effective value is `source`'s, including `source` itself
    fn readers_of(&self, source: &CellRef) -> Vec<CellRef> {
        let mut found = vec![source.clone()];
        let mut seen: FxHashSet<CellRef> = FxHashSet::default();
        seen.insert(source.clone());

        let mut cursor = 0;
        while cursor < found.len() {
            let upstream = found[cursor].clone();
            cursor += 1;
            for reader in self.mirrors.get(&upstream).into_iter().flatten() {
                if seen.insert(reader.clone()) {
                    found.push(reader.clone());
                }
            }
        }
        found
    }

    /// Number of cells bound directly to `target`
    #[must_use]
    pub fn mirror_count(&self, target: &CellRef) -> usize {
        self.mirrors.get(target).map_or(0, Vec::len)
    }

    fn invalidate_readers(&mut self, source: &CellRef) -> Result<(), LookupError> {
        let mut owners: Vec<ObjectId> = self.readers_of(source).iter().map(|c| c.object).collect();
        owners.sort_unstable();
        owners.dedup();
        for owner in owners {
            self.invalidate(owner)?;
        }
        Ok(())
    }

    // ========================================================================
    // Run snapshots
    // ========================================================================

    pub(crate) fn snapshot(&self, id: ObjectId, key: &str) -> Result<CellSnapshot, LookupError> {
        let object = self.object(id)?;
        if key == DIMENSION_KEY && matches!(object.kind, ObjectKind::Leaf) {
            return Ok(CellSnapshot::Dimension {
                object: id,
                size: object.placement.size(),
            });
        }
        // A swept cell counts as written, so a bound one comes back detached
        // and holding the value it mirrored before the run.
        let saved = match object.cell(key) {
            Some(cell) if cell.is_bound() => Some(ParameterCell::detached(
                self.read(id, key).ok().cloned(),
            )),
            other => other.cloned(),
        };
        Ok(CellSnapshot::Cell {
            cell: CellRef::new(id, key),
            saved,
        })
    }

    pub(crate) fn restore(&mut self, snapshot: CellSnapshot) -> Result<(), SimError> {
        match snapshot {
            CellSnapshot::Dimension { object, size } => self.set_leaf_size(object, size),
            CellSnapshot::Cell { cell, saved } => {
                self.object(cell.object)?;
                self.unlink(&cell);
                if let Some(target) = saved.as_ref().and_then(ParameterCell::bound_to) {
                    self.mirrors
                        .entry(target.clone())
                        .or_default()
                        .push(cell.clone());
                }
                let params = &mut self.object_mut(cell.object)?.params;
                match saved {
                    Some(saved) => {
                        params.insert(cell.key.clone(), saved);
                    }
                    None => {
                        params.remove(&cell.key);
                    }
                }
                self.invalidate_readers(&cell)?;
                Ok(())
            }
        }
    }
}

impl<A> Sweepable for Registry<A> {
    fn apply(&mut self, target: ObjectId, key: &str, value: &Value) -> Result<(), SimError> {
        self.write(target, key, value.clone())
    }
}

impl<A> Replicate for Registry<A> {
    /// Parameters, bindings and structure only. Caches are left behind and
    /// every node starts dirty.
    fn replicate(&self) -> Self {
        let objects = self
            .objects
            .iter()
            .map(|object| Object {
                name: object.name.clone(),
                aliases: object.aliases.clone(),
                kind: object.kind.clone(),
                placement: object.placement,
                params: object.params.clone(),
                node: object.node.blank(),
            })
            .collect();
        Self {
            objects,
            names: self.names.clone(),
            mirrors: self.mirrors.clone(),
        }
    }
}
