//! Explicit registration table for in-process toolsets.
//!
//! Manifests declare toolsets as `module:Class`-style reference strings. The
//! references stay opaque to the loader; this table maps each known
//! reference to a factory populated at build time, so resolution is a plain
//! lookup rather than reflection.

use crate::error::{Result, SkillError};
use std::collections::HashMap;

/// An in-process capability class contributed by a skill.
pub trait Toolset: Send + Sync {
    /// The reference name this toolset answers to.
    fn name(&self) -> &str;
}

type ToolsetFactory = Box<dyn Fn() -> Box<dyn Toolset> + Send + Sync>;

/// Registry mapping toolset reference strings to factories.
#[derive(Default)]
pub struct ToolsetRegistry {
    factories: HashMap<String, ToolsetFactory>,
}

impl ToolsetRegistry {
    /// Creates a new empty toolset registry.
    pub fn new() -> Self {
        Self { factories: HashMap::new() }
    }

    /// Registers a factory for a toolset reference.
    ///
    /// Returns an error if the reference is already registered.
    pub fn register<F>(&mut self, reference: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn() -> Box<dyn Toolset> + Send + Sync + 'static,
    {
        let reference = reference.into();

        if self.factories.contains_key(&reference) {
            return Err(SkillError::DuplicateName(reference));
        }

        self.factories.insert(reference, Box::new(factory));
        Ok(())
    }

    /// Instantiates the toolset behind a reference.
    pub fn resolve(&self, reference: &str) -> Result<Box<dyn Toolset>> {
        match self.factories.get(reference) {
            Some(factory) => Ok(factory()),
            None => Err(SkillError::NotFound(format!("toolset reference '{}'", reference))),
        }
    }

    /// Instantiates every resolvable reference, returning the unknown ones
    /// alongside so the caller can report them.
    pub fn resolve_all(&self, references: &[String]) -> (Vec<Box<dyn Toolset>>, Vec<String>) {
        let mut resolved = Vec::new();
        let mut unknown = Vec::new();

        for reference in references {
            match self.resolve(reference) {
                Ok(toolset) => resolved.push(toolset),
                Err(_) => unknown.push(reference.clone()),
            }
        }

        (resolved, unknown)
    }

    /// Whether a reference is registered.
    pub fn contains(&self, reference: &str) -> bool {
        self.factories.contains_key(reference)
    }

    /// All registered references.
    pub fn list(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Number of registered references.
    pub fn count(&self) -> usize {
        self.factories.len()
    }
}
