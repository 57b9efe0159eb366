//! In-memory index of loaded skills' disclosure metadata.
//!
//! Built once per process from loader output and handed to the context
//! provider; never persisted. Constructed explicitly and passed to its
//! consumers rather than living in process-wide state.

use crate::manifest::{SkillManifest, TriggerSet};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use tracing::warn;

/// Runtime projection of a manifest used for disclosure decisions.
#[derive(Debug, Clone)]
pub struct SkillDocs {
    pub name: String,
    pub brief_description: String,
    pub triggers: TriggerSet,
    /// Declared trigger patterns, compiled case-insensitively once at index
    /// build. Malformed patterns are logged and dropped here.
    pub pattern_matchers: Vec<Regex>,
    pub instructions: String,
}

impl From<&SkillManifest> for SkillDocs {
    fn from(manifest: &SkillManifest) -> Self {
        let pattern_matchers = manifest
            .triggers
            .patterns
            .iter()
            .filter_map(|pattern| {
                match RegexBuilder::new(pattern).case_insensitive(true).build() {
                    Ok(regex) => Some(regex),
                    Err(e) => {
                        warn!(skill = %manifest.name, pattern = %pattern, error = %e, "malformed trigger pattern, skipping");
                        None
                    }
                }
            })
            .collect();

        Self {
            name: manifest.name.clone(),
            brief_description: manifest.brief_description.clone(),
            triggers: manifest.triggers.clone(),
            pattern_matchers,
            instructions: manifest.instructions.clone(),
        }
    }
}

/// Documentation table keyed by skill name, preserving insertion order for
/// deterministic disclosure.
#[derive(Debug, Clone, Default)]
pub struct DocIndex {
    docs: HashMap<String, SkillDocs>,
    order: Vec<String>,
}

impl DocIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a loaded skill's documentation. A re-added name replaces the
    /// previous docs but keeps its position.
    pub fn add_skill(&mut self, manifest: &SkillManifest) {
        let docs = SkillDocs::from(manifest);
        if !self.docs.contains_key(&docs.name) {
            self.order.push(docs.name.clone());
        }
        self.docs.insert(docs.name.clone(), docs);
    }

    /// Whether any skills are loaded.
    pub fn has_skills(&self) -> bool {
        !self.docs.is_empty()
    }

    /// Number of loaded skills.
    pub fn count(&self) -> usize {
        self.docs.len()
    }

    /// All documentation entries in insertion order.
    pub fn all_metadata(&self) -> Vec<&SkillDocs> {
        self.order.iter().filter_map(|name| self.docs.get(name)).collect()
    }
}
