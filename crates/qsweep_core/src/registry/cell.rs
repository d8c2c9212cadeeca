//! Parameter cells
//!
//! A cell holds an optional local value and may instead mirror another cell
//! (for example a sub-system inheriting a setting from its owner). Resolving
//! the mirror needs the registry, so `read` lives on
//! [`Registry::read`](super::Registry::read); the cell itself only records
//! what it holds.

use crate::model::{CellRef, Value};

/// Link state of a parameter cell
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Binding {
    /// Never linked
    #[default]
    Unset,
    /// Mirrors the effective value of another cell
    Bound(CellRef),
    /// Was linked, then written directly. Distinct from `Unset` so the
    /// cell is never re-linked implicitly.
    Broken,
}

/// Value holder for a single named parameter of an object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterCell {
    local: Option<Value>,
    binding: Binding,
}

impl ParameterCell {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_value(value: impl Into<Value>) -> Self {
        Self {
            local: Some(value.into()),
            binding: Binding::Unset,
        }
    }

    /// The locally stored value, ignoring any binding
    #[must_use]
    pub fn local(&self) -> Option<&Value> {
        self.local.as_ref()
    }

    #[must_use]
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Target cell while the binding is intact
    #[must_use]
    pub fn bound_to(&self) -> Option<&CellRef> {
        match &self.binding {
            Binding::Bound(target) => Some(target),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        matches!(self.binding, Binding::Bound(_))
    }

    /// A cell that has been written at some point and holds `local`
    pub(crate) fn detached(local: Option<Value>) -> Self {
        Self {
            local,
            binding: Binding::Broken,
        }
    }

    pub(crate) fn bind(&mut self, target: CellRef) {
        self.binding = Binding::Bound(target);
    }

    /// Direct write: breaks any binding permanently and stores the value
    pub(crate) fn store(&mut self, value: Value) {
        self.binding = Binding::Broken;
        self.local = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectId;

    #[test]
    fn test_store_breaks_binding() {
        let mut cell = ParameterCell::new();
        cell.bind(CellRef::new(ObjectId(0), "frequency"));
        assert!(cell.is_bound());

        cell.store(Value::Float(2.0));
        assert_eq!(cell.binding(), &Binding::Broken);
        assert_eq!(cell.bound_to(), None);
        assert_eq!(cell.local(), Some(&Value::Float(2.0)));
    }

    #[test]
    fn test_new_cell_is_empty_and_unset() {
        let cell = ParameterCell::new();
        assert_eq!(cell.local(), None);
        assert_eq!(cell.binding(), &Binding::Unset);
    }
}
