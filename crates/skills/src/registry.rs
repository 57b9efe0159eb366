//! Durable record of installed skills.
//!
//! The registry is a single JSON file mapping canonical skill name to its
//! install record. Every mutation loads the whole table, applies the change,
//! and writes the whole table back through a temp-file-then-rename so the
//! file is never observed half-written. The registry is a cache of installs,
//! not their source of truth: a missing or corrupt file is treated as an
//! empty table, never as a fatal error.

use crate::error::{Result, SkillError};
use crate::security;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default registry file name inside the skills root.
pub const REGISTRY_FILE: &str = "registry.json";

/// Persisted install record for one skill.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Display name as declared in the manifest
    pub name: String,

    /// Lowercase, hyphen-normalized unique key
    pub canonical_name: String,

    /// Clone URL; None for bundled skills
    #[serde(default)]
    pub source_url: Option<String>,

    /// Pinned revision identifier
    pub revision: String,

    /// Branch requested at install time
    #[serde(default)]
    pub branch: Option<String>,

    /// Tag requested at install time
    #[serde(default)]
    pub tag: Option<String>,

    /// Absolute install path
    pub install_path: PathBuf,

    /// True once a human has vetted the source (automatic for bundled)
    pub trusted: bool,

    /// Install timestamp (RFC 3339 in the file)
    pub installed_at: DateTime<Utc>,
}

/// The on-disk skill registry.
#[derive(Debug, Clone)]
pub struct SkillRegistry {
    path: PathBuf,
}

impl SkillRegistry {
    /// Open a registry backed by the given file. The file is created on the
    /// first mutation; a nonexistent file reads as an empty table.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The registry file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a new install. Fails when the canonical name is taken.
    pub fn register(&self, entry: RegistryEntry) -> Result<()> {
        let mut table = self.load();

        if table.contains_key(&entry.canonical_name) {
            return Err(SkillError::DuplicateName(entry.canonical_name));
        }

        table.insert(entry.canonical_name.clone(), entry);
        self.save(&table)
    }

    /// Drop a skill's record. Fails when the canonical name is unknown.
    pub fn unregister(&self, canonical_name: &str) -> Result<()> {
        let mut table = self.load();

        if table.remove(canonical_name).is_none() {
            return Err(SkillError::NotFound(canonical_name.to_string()));
        }

        self.save(&table)
    }

    /// Look up an entry by any case/underscore variant of its name.
    pub fn get(&self, name: &str) -> Result<RegistryEntry> {
        let canonical = security::normalize(name)?;
        self.get_by_canonical(&canonical)
    }

    /// Look up an entry by its exact canonical name.
    pub fn get_by_canonical(&self, canonical_name: &str) -> Result<RegistryEntry> {
        self.load()
            .remove(canonical_name)
            .ok_or_else(|| SkillError::NotFound(canonical_name.to_string()))
    }

    /// All entries, sorted by canonical name.
    pub fn list(&self) -> Vec<RegistryEntry> {
        self.load().into_values().collect()
    }

    /// Replace the pinned revision of an existing entry.
    pub fn update_revision(&self, canonical_name: &str, revision: &str) -> Result<()> {
        let mut table = self.load();

        match table.get_mut(canonical_name) {
            Some(entry) => entry.revision = revision.to_string(),
            None => return Err(SkillError::NotFound(canonical_name.to_string())),
        }

        self.save(&table)
    }

    /// Whether a skill is registered. Never errors; names that fail
    /// normalization simply do not exist.
    pub fn exists(&self, name: &str) -> bool {
        match security::normalize(name) {
            Ok(canonical) => self.load().contains_key(&canonical),
            Err(_) => false,
        }
    }

    /// Number of registered skills.
    pub fn count(&self) -> usize {
        self.load().len()
    }

    fn load(&self) -> BTreeMap<String, RegistryEntry> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return BTreeMap::new(),
        };

        match serde_json::from_str(&content) {
            Ok(table) => table,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt skill registry, treating as empty");
                BTreeMap::new()
            }
        }
    }

    fn save(&self, table: &BTreeMap<String, RegistryEntry>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(table)
            .map_err(|e| SkillError::Io(std::io::Error::other(e.to_string())))?;

        // Atomic write: temp file in the same directory, then rename.
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}
