//! System Builder
//!
//! The SystemBuilder provides a fluent API for assembling a registry of
//! simulated objects by name. Steps are recorded and resolved in `build`, so
//! objects may be referenced before they are declared.
//!
//! # Example
//!
//! ```ignore
//! use qsweep_core::config::SystemBuilder;
//!
//! let registry = SystemBuilder::new()
//!     .leaf("qubit", 2)
//!     .leaf("cavity", 10)
//!     .composite("system", ["qubit", "cavity"])
//!     .term("coupling")
//!     .param("qubit", "frequency", 5.0)
//!     .param("coupling", "g", 0.1)
//!     .bind("cavity", "temperature", "qubit", "temperature")
//!     .depends_on("coupling", "system")
//!     .rebuild("qubit", |view| view.f64("frequency"))
//!     .build()?;
//! ```
//!
//! The free functions [`leaf`], [`composite`] and [`term`] do the same thing
//! directly against an existing registry.

use std::sync::Arc;

use crate::error::{RebuildError, SimError};
use crate::model::{CellRef, ObjectId, Value};
use crate::registry::{ParamView, Rebuild, Registry};

enum Declaration {
    Leaf { name: String, size: usize },
    Composite { name: String, members: Vec<String> },
    Term { name: String },
}

enum Step<A> {
    Alias {
        object: String,
        alias: String,
    },
    Param {
        object: String,
        key: String,
        value: Value,
    },
    Bind {
        object: String,
        key: String,
        source: String,
        source_key: String,
    },
    DependsOn {
        dependent: String,
        upstream: String,
    },
    Rebuild {
        object: String,
        rebuild: Arc<dyn Rebuild<A>>,
    },
}

/// Builder for registries with name-based references
pub struct SystemBuilder<A> {
    declarations: Vec<Declaration>,
    steps: Vec<Step<A>>,
}

impl<A> Default for SystemBuilder<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> SystemBuilder<A> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            declarations: Vec::new(),
            steps: Vec::new(),
        }
    }

    // =========================================================================
    // Objects
    // =========================================================================

    /// Declare a dimensional leaf
    #[must_use]
    pub fn leaf(mut self, name: impl Into<String>, size: usize) -> Self {
        self.declarations.push(Declaration::Leaf {
            name: name.into(),
            size,
        });
        self
    }

    /// Declare a composite over the named members, in tensor order
    #[must_use]
    pub fn composite<I, S>(mut self, name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declarations.push(Declaration::Composite {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Declare a parameter holder without a dimension (term, coupling, settings)
    #[must_use]
    pub fn term(mut self, name: impl Into<String>) -> Self {
        self.declarations
            .push(Declaration::Term { name: name.into() });
        self
    }

    #[must_use]
    pub fn alias(mut self, object: impl Into<String>, alias: impl Into<String>) -> Self {
        self.steps.push(Step::Alias {
            object: object.into(),
            alias: alias.into(),
        });
        self
    }

    // =========================================================================
    // Parameters and dependencies
    // =========================================================================

    #[must_use]
    pub fn param(mut self, object: impl Into<String>, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.steps.push(Step::Param {
            object: object.into(),
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Make `object.key` mirror `source.source_key`
    #[must_use]
    pub fn bind(
        mut self,
        object: impl Into<String>,
        key: impl Into<String>,
        source: impl Into<String>,
        source_key: impl Into<String>,
    ) -> Self {
        self.steps.push(Step::Bind {
            object: object.into(),
            key: key.into(),
            source: source.into(),
            source_key: source_key.into(),
        });
        self
    }

    /// Invalidate `dependent` whenever `upstream` is invalidated
    #[must_use]
    pub fn depends_on(mut self, dependent: impl Into<String>, upstream: impl Into<String>) -> Self {
        self.steps.push(Step::DependsOn {
            dependent: dependent.into(),
            upstream: upstream.into(),
        });
        self
    }

    #[must_use]
    pub fn rebuild<F>(mut self, object: impl Into<String>, rebuild: F) -> Self
    where
        F: Fn(&ParamView<'_, A>) -> Result<A, RebuildError> + Send + Sync + 'static,
    {
        self.steps.push(Step::Rebuild {
            object: object.into(),
            rebuild: Arc::new(rebuild),
        });
        self
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Create every declared object, then apply the remaining steps in order
    pub fn build(self) -> Result<Registry<A>, SimError> {
        let mut registry = Registry::new();

        // 1. Objects, so later steps can refer to any of them by name
        for declaration in &self.declarations {
            match declaration {
                Declaration::Leaf { name, size } => {
                    registry.create_leaf(name, *size)?;
                }
                Declaration::Composite { name, .. } => {
                    registry.create_composite(name)?;
                }
                Declaration::Term { name } => {
                    registry.create_plain(name)?;
                }
            }
        }

        // 2. Membership
        for declaration in &self.declarations {
            if let Declaration::Composite { name, members } = declaration {
                let composite = registry.lookup(name)?;
                for member in members {
                    let leaf = registry.lookup(member)?;
                    registry.add_leaf(composite, leaf, None)?;
                }
            }
        }

        // 3. Everything else, in the order given
        for step in self.steps {
            match step {
                Step::Alias { object, alias } => {
                    let id = registry.lookup(&object)?;
                    registry.add_alias(id, &alias)?;
                }
                Step::Param { object, key, value } => {
                    let id = registry.lookup(&object)?;
                    registry.write(id, &key, value)?;
                }
                Step::Bind {
                    object,
                    key,
                    source,
                    source_key,
                } => {
                    let id = registry.lookup(&object)?;
                    let source = registry.lookup(&source)?;
                    registry.bind(id, &key, CellRef::new(source, source_key))?;
                }
                Step::DependsOn {
                    dependent,
                    upstream,
                } => {
                    let dependent = registry.lookup(&dependent)?;
                    let upstream = registry.lookup(&upstream)?;
                    registry.register_dependent(upstream, dependent)?;
                }
                Step::Rebuild { object, rebuild } => {
                    let id = registry.lookup(&object)?;
                    registry.set_rebuild_with(id, rebuild)?;
                }
            }
        }

        Ok(registry)
    }
}

/// Create a leaf with initial parameters
pub fn leaf<A, K>(
    registry: &mut Registry<A>,
    name: &str,
    size: usize,
    params: impl IntoIterator<Item = (K, Value)>,
) -> Result<ObjectId, SimError>
where
    K: AsRef<str>,
{
    let id = registry.create_leaf(name, size)?;
    for (key, value) in params {
        registry.write(id, key.as_ref(), value)?;
    }
    Ok(id)
}

/// Create a composite over existing objects, in tensor order
pub fn composite<A>(registry: &mut Registry<A>, name: &str, members: &[ObjectId]) -> Result<ObjectId, SimError> {
    let id = registry.create_composite(name)?;
    for &member in members {
        registry.add_leaf(id, member, None)?;
    }
    Ok(id)
}

/// Create a term that depends on the objects it acts on
pub fn term<A, K>(
    registry: &mut Registry<A>,
    name: &str,
    acts_on: &[ObjectId],
    params: impl IntoIterator<Item = (K, Value)>,
) -> Result<ObjectId, SimError>
where
    K: AsRef<str>,
{
    let id = registry.create_plain(name)?;
    for (key, value) in params {
        registry.write(id, key.as_ref(), value)?;
    }
    for &upstream in acts_on {
        registry.register_dependent(upstream, id)?;
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, LookupError};

    #[test]
    fn test_builder_resolves_names_in_any_order() {
        let registry: Registry<f64> = SystemBuilder::new()
            .composite("system", ["qubit", "cavity"])
            .param("qubit", "frequency", 5.0)
            .leaf("qubit", 2)
            .leaf("cavity", 10)
            .term("coupling")
            .alias("qubit", "q")
            .param("coupling", "g", 0.1)
            .depends_on("coupling", "system")
            .rebuild("qubit", |view| view.f64("frequency"))
            .build()
            .unwrap();

        let system = registry.lookup("system").unwrap();
        let qubit = registry.lookup("q").unwrap();
        let coupling = registry.lookup("coupling").unwrap();
        assert_eq!(registry.object(system).unwrap().placement().size(), 20);
        assert_eq!(registry.read(qubit, "frequency").unwrap(), &Value::Float(5.0));
        assert!(registry.object(system).unwrap().node().dependents().contains(&coupling));
        assert!(registry.object(qubit).unwrap().node().has_rebuild());
    }

    #[test]
    fn test_builder_bind() {
        let registry: Registry<()> = SystemBuilder::new()
            .term("settings")
            .leaf("qubit", 2)
            .param("settings", "temperature", 0.05)
            .bind("qubit", "temperature", "settings", "temperature")
            .build()
            .unwrap();

        let qubit = registry.lookup("qubit").unwrap();
        assert_eq!(registry.read(qubit, "temperature").unwrap(), &Value::Float(0.05));
        assert!(registry.cell(qubit, "temperature").unwrap().is_bound());
    }

    #[test]
    fn test_builder_errors() {
        let err = SystemBuilder::<()>::new()
            .leaf("qubit", 2)
            .param("qbit", "frequency", 5.0)
            .build()
            .unwrap_err();
        assert_eq!(err, SimError::Lookup(LookupError::NameNotFound("qbit".to_string())));

        let err = SystemBuilder::<()>::new()
            .leaf("qubit", 2)
            .term("qubit")
            .build()
            .unwrap_err();
        assert_eq!(err, SimError::Config(ConfigError::DuplicateName("qubit".to_string())));
    }

    #[test]
    fn test_factory_functions() {
        let mut registry: Registry<()> = Registry::new();
        let q = leaf(&mut registry, "qubit", 2, [("frequency", Value::Float(5.0))]).unwrap();
        let c = leaf(&mut registry, "cavity", 4, Vec::<(String, Value)>::new()).unwrap();
        let system = composite(&mut registry, "system", &[q, c]).unwrap();
        let g = term(&mut registry, "coupling", &[q, c], [("g", Value::Float(0.1))]).unwrap();

        assert_eq!(registry.object(system).unwrap().members(), &[q, c]);
        assert!(registry.object(q).unwrap().node().dependents().contains(&g));
        assert_eq!(registry.read(g, "g").unwrap(), &Value::Float(0.1));
    }
}
