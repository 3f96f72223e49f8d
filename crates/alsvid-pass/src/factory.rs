//! The pass factory: a registry from type names to pass constructors.
//!
//! Type names are dotted paths (`sch.Schedule`). Two derived-factory
//! transformations exist:
//!
//! - *Do-not-use resolution*: entries with a `dnu` path component are
//!   hidden unless the user explicitly opted into the full type name, in
//!   which case the entry is re-inserted with the `dnu` components
//!   stripped.
//! - *Architecture aliasing*: entries prefixed with `arch.<architecture>.`
//!   are duplicated under the stripped name, so strategies can refer to
//!   them without the prefix.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{PassError, PassResult};
use crate::pass::{GenericGroup, PassImpl, PassNode};
use crate::passes;

/// Constructor for a pass implementation; receives the desugared type name
/// the pass was addressed by.
pub type PassConstructor = fn(type_name: String) -> Box<dyn PassImpl>;

/// Registry from pass type name to constructor.
#[derive(Clone, Default)]
pub struct Factory {
    constructors: BTreeMap<String, PassConstructor>,
}

impl Factory {
    /// Create an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// The default registry with the built-in passes.
    pub fn default_registry() -> Self {
        let mut factory = Self::new();
        factory.register("sch.Schedule", passes::sched::construct);
        factory.register("arch.ctrl.sch.Schedule", passes::sched::construct);
        factory.register("dnu.sch.GreedySchedule", passes::sched::construct_greedy);
        factory.register("ana.ConsistencyCheck", passes::consistency::construct);
        factory
    }

    /// Register a pass type.
    pub fn register(&mut self, type_name: impl Into<String>, constructor: PassConstructor) {
        self.constructors.insert(type_name.into(), constructor);
    }

    /// Registered type names, in order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Derive the factory visible to a strategy: resolve do-not-use
    /// entries against the opt-in list and alias architecture-specific
    /// entries under their stripped names.
    pub fn configure(&self, architecture: &str, dnu: &BTreeSet<String>) -> Factory {
        let mut derived = self.clone();

        for (type_name, constructor) in &self.constructors {
            let mut is_dnu = false;
            let mut stripped = String::new();
            for element in type_name.split('.') {
                if element == "dnu" {
                    is_dnu = true;
                } else {
                    if !stripped.is_empty() {
                        stripped.push('.');
                    }
                    stripped.push_str(element);
                }
            }
            if !is_dnu {
                continue;
            }
            derived.constructors.remove(type_name);
            if dnu.contains(type_name) {
                derived.constructors.insert(stripped, *constructor);
            }
        }

        if !architecture.is_empty() {
            let prefix = format!("arch.{architecture}.");
            let aliases: Vec<(String, PassConstructor)> = derived
                .constructors
                .iter()
                .filter(|(name, _)| name.starts_with(&prefix))
                .map(|(name, ctor)| (name[prefix.len()..].to_string(), *ctor))
                .collect();
            for (name, ctor) in aliases {
                derived.constructors.insert(name, ctor);
            }
        }

        derived
    }

    /// Build a pass node. An empty type name builds a generic group.
    pub fn build_pass(&self, type_name: &str, instance_name: &str) -> PassResult<PassNode> {
        if type_name.is_empty() {
            return Ok(PassNode::new(
                Box::new(GenericGroup),
                instance_name.to_string(),
                true,
            ));
        }
        let constructor =
            self.constructors
                .get(type_name)
                .ok_or_else(|| PassError::UnknownPassType {
                    type_name: type_name.into(),
                })?;
        Ok(PassNode::new(
            constructor(type_name.to_string()),
            instance_name.to_string(),
            false,
        ))
    }

    /// Dump documentation for every registered pass type.
    pub fn dump_pass_types(&self, w: &mut impl fmt::Write) -> fmt::Result {
        for (type_name, constructor) in &self.constructors {
            writeln!(w, "Pass {type_name}:")?;
            let node = PassNode::new(constructor(type_name.clone()), String::new(), false);
            node.dump_docs(w, "  ")?;
            writeln!(w)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("types", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dnu_hidden_by_default() {
        let factory = Factory::default_registry().configure("", &BTreeSet::new());
        assert!(factory.build_pass("dnu.sch.GreedySchedule", "g").is_err());
        assert!(factory.build_pass("sch.GreedySchedule", "g").is_err());
        assert!(factory.build_pass("sch.Schedule", "s").is_ok());
    }

    #[test]
    fn test_dnu_opt_in_strips_component() {
        let dnu: BTreeSet<String> = ["dnu.sch.GreedySchedule".to_string()].into();
        let factory = Factory::default_registry().configure("", &dnu);
        assert!(factory.build_pass("sch.GreedySchedule", "g").is_ok());
        assert!(factory.build_pass("dnu.sch.GreedySchedule", "g").is_err());
    }

    #[test]
    fn test_architecture_aliasing() {
        let factory = Factory::default_registry().configure("ctrl", &BTreeSet::new());
        let aliased = factory.build_pass("sch.Schedule", "s").unwrap();
        assert_eq!(aliased.type_name(), "sch.Schedule");
        // The prefixed name keeps working too.
        assert!(factory.build_pass("arch.ctrl.sch.Schedule", "s").is_ok());
    }

    #[test]
    fn test_unknown_type() {
        let factory = Factory::default_registry();
        let err = factory.build_pass("no.Such", "x").unwrap_err();
        assert!(matches!(err, PassError::UnknownPassType { .. }));
    }
}
