//! Install/update/remove lifecycle for skills.
//!
//! The manager owns the on-disk skill directories; the registry owns the
//! install table. Each skill is either Installed (directory present, entry
//! registered) or Absent. All git work goes through [`VersionControl`] and
//! happens only in these explicit lifecycle calls, never on the per-turn
//! path.

use crate::error::{Result, SkillError};
use crate::loader;
use crate::manifest::SkillManifest;
use crate::registry::{REGISTRY_FILE, RegistryEntry, SkillRegistry};
use crate::security;
use crate::vcs::{GitBackend, VersionControl};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Descriptive metadata merged from the registry and a fresh manifest parse.
#[derive(Debug, Clone)]
pub struct SkillInfo {
    pub name: String,
    pub canonical_name: String,
    pub description: String,
    pub brief_description: String,
    pub version: Option<String>,
    pub revision: String,
    pub source_url: Option<String>,
    pub trusted: bool,
    pub installed_at: DateTime<Utc>,
    pub script_count: usize,
    pub toolsets: Vec<String>,
}

/// Orchestrates the skill lifecycle over a skills root directory.
pub struct SkillManager {
    skills_root: PathBuf,
    registry: SkillRegistry,
    vcs: Box<dyn VersionControl>,
}

impl SkillManager {
    /// Manager over `skills_root` with the default git backend. The registry
    /// file lives inside the root.
    pub fn new(skills_root: impl Into<PathBuf>) -> Self {
        let skills_root = skills_root.into();
        let registry = SkillRegistry::new(skills_root.join(REGISTRY_FILE));
        Self { skills_root, registry, vcs: Box::new(GitBackend::new()) }
    }

    /// Manager with an explicit registry and version-control backend.
    pub fn with_backend(skills_root: impl Into<PathBuf>, registry: SkillRegistry, vcs: Box<dyn VersionControl>) -> Self {
        Self { skills_root: skills_root.into(), registry, vcs }
    }

    /// The directory skills are installed under.
    pub fn skills_root(&self) -> &Path {
        &self.skills_root
    }

    /// The backing registry.
    pub fn registry(&self) -> &SkillRegistry {
        &self.registry
    }

    /// Install a skill from a version-controlled source.
    ///
    /// Clones to a staging directory, parses and validates the manifest,
    /// pins the checked-out revision, moves the directory under the
    /// canonical name, and registers the entry. External sources must be
    /// explicitly trusted; the trust check runs before any filesystem
    /// mutation so a refused install leaves no partial state. Returns the
    /// newly installed entries.
    pub fn install(
        &self,
        source: &str,
        branch: Option<&str>,
        tag: Option<&str>,
        trusted: bool,
    ) -> Result<Vec<RegistryEntry>> {
        let display = source_display_name(source);
        security::confirm_untrusted_install(&display, Some(source), trusted)?;

        fs::create_dir_all(&self.skills_root)?;
        let staging = self.skills_root.join(format!(
            ".staging-{}-{}",
            std::process::id(),
            STAGING_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        let result = self.install_staged(source, branch, tag, trusted, &staging);
        if result.is_err() && staging.exists() {
            let _ = fs::remove_dir_all(&staging);
        }
        result
    }

    fn install_staged(
        &self,
        source: &str,
        branch: Option<&str>,
        tag: Option<&str>,
        trusted: bool,
        staging: &Path,
    ) -> Result<Vec<RegistryEntry>> {
        self.vcs.clone_repo(source, staging, branch, tag)?;

        let manifest = SkillManifest::parse(staging)?;
        let canonical = security::normalize(&manifest.name)?;

        if self.registry.exists(&canonical) {
            return Err(SkillError::DuplicateName(canonical));
        }

        let install_path = self.skills_root.join(&canonical);
        if install_path.exists() {
            return Err(SkillError::DuplicateName(format!(
                "{} (directory already present)",
                canonical
            )));
        }

        let revision = self.vcs.current_revision(staging)?;
        fs::rename(staging, &install_path)?;

        let entry = RegistryEntry {
            name: manifest.name.clone(),
            canonical_name: canonical.clone(),
            source_url: Some(source.to_string()),
            revision,
            branch: branch.map(String::from),
            tag: tag.map(String::from),
            install_path,
            trusted,
            installed_at: Utc::now(),
        };

        self.registry.register(entry.clone())?;
        info!(skill = %canonical, revision = %entry.revision, "installed skill");

        Ok(vec![entry])
    }

    /// Register a skill directory shipped with the agent. Bundled skills
    /// have no source URL and are auto-trusted; the directory stays where it
    /// is.
    pub fn install_bundled(&self, path: &Path) -> Result<RegistryEntry> {
        let manifest = SkillManifest::parse(path)?;
        let canonical = security::normalize(&manifest.name)?;

        if self.registry.exists(&canonical) {
            return Err(SkillError::DuplicateName(canonical));
        }

        let revision = self
            .vcs
            .current_revision(path)
            .unwrap_or_else(|_| "local".to_string());

        let entry = RegistryEntry {
            name: manifest.name.clone(),
            canonical_name: canonical,
            source_url: None,
            revision,
            branch: None,
            tag: None,
            install_path: path.to_path_buf(),
            trusted: true,
            installed_at: Utc::now(),
        };

        self.registry.register(entry.clone())?;
        Ok(entry)
    }

    /// Update an installed skill to the latest state of its source,
    /// re-pinning the revision. Only the revision field of the registry
    /// entry changes.
    pub fn update(&self, name: &str) -> Result<RegistryEntry> {
        let entry = self.registry.get(name)?;

        if entry.source_url.is_none() {
            return Err(SkillError::Security(format!(
                "skill '{}' is bundled and has no source to update from",
                entry.canonical_name
            )));
        }

        let revision = self.vcs.fetch_and_reset(&entry.install_path)?;
        self.registry.update_revision(&entry.canonical_name, &revision)?;
        info!(skill = %entry.canonical_name, revision = %revision, "updated skill");

        self.registry.get_by_canonical(&entry.canonical_name)
    }

    /// Remove an installed skill: delete its directory, then unregister.
    ///
    /// A crash between the two steps leaves at worst an orphaned registry
    /// entry whose path no longer resolves; running remove again clears it.
    pub fn remove(&self, name: &str) -> Result<()> {
        let entry = self.registry.get(name)?;

        if entry.install_path.exists() {
            fs::remove_dir_all(&entry.install_path)?;
        } else {
            warn!(skill = %entry.canonical_name, path = %entry.install_path.display(),
                "skill directory already missing, clearing registry entry");
        }

        self.registry.unregister(&entry.canonical_name)?;
        info!(skill = %entry.canonical_name, "removed skill");
        Ok(())
    }

    /// All installed skills, sorted by canonical name.
    pub fn list(&self) -> Vec<RegistryEntry> {
        self.registry.list()
    }

    /// Descriptive metadata for one skill, merged from its registry entry
    /// and a fresh manifest parse. Read-only.
    pub fn info(&self, name: &str) -> Result<SkillInfo> {
        let entry = self.registry.get(name)?;
        let manifest = SkillManifest::parse(&entry.install_path)?;
        let scripts = loader::discover_scripts(&entry.install_path, &manifest)?;

        Ok(SkillInfo {
            name: entry.name,
            canonical_name: entry.canonical_name,
            description: manifest.description,
            brief_description: manifest.brief_description,
            version: manifest.version,
            revision: entry.revision,
            source_url: entry.source_url,
            trusted: entry.trusted,
            installed_at: entry.installed_at,
            script_count: scripts.len(),
            toolsets: manifest.toolsets,
        })
    }
}

/// Best-effort human-readable name for a source URL, for error messages
/// issued before the manifest is available.
fn source_display_name(source: &str) -> String {
    source
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(source)
        .trim_end_matches(".git")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Fake backend: "cloning" writes a SKILL.md, revisions are scripted.
    struct MockVcs {
        skill_name: String,
        revisions: Mutex<Vec<String>>,
    }

    impl MockVcs {
        fn new(skill_name: &str, revisions: &[&str]) -> Self {
            let mut revisions: Vec<String> = revisions.iter().map(|r| r.to_string()).collect();
            revisions.reverse();
            Self { skill_name: skill_name.to_string(), revisions: Mutex::new(revisions) }
        }

        fn next_revision(&self) -> String {
            let mut revisions = self.revisions.lock().unwrap();
            if revisions.len() > 1 { revisions.pop().unwrap() } else { revisions.last().unwrap().clone() }
        }
    }

    impl VersionControl for MockVcs {
        fn clone_repo(&self, _url: &str, dest: &Path, _branch: Option<&str>, _tag: Option<&str>) -> Result<()> {
            fs::create_dir_all(dest)?;
            fs::write(
                dest.join("SKILL.md"),
                format!("---\nname: {}\ndescription: A mock skill\n---\nInstructions.\n", self.skill_name),
            )?;
            Ok(())
        }

        fn current_revision(&self, _repo: &Path) -> Result<String> {
            Ok(self.next_revision())
        }

        fn fetch_and_reset(&self, _repo: &Path) -> Result<String> {
            Ok(self.next_revision())
        }
    }

    fn manager(temp: &TempDir, vcs: MockVcs) -> SkillManager {
        let root = temp.path().join("skills");
        let registry = SkillRegistry::new(root.join(REGISTRY_FILE));
        SkillManager::with_backend(root, registry, Box::new(vcs))
    }

    #[test]
    fn test_install_registers_and_moves_directory() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp, MockVcs::new("Kalshi_Markets", &["rev1"]));

        let entries = manager
            .install("https://example.com/kalshi.git", None, None, true)
            .unwrap();

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.canonical_name, "kalshi-markets");
        assert_eq!(entry.revision, "rev1");
        assert!(entry.trusted);
        assert!(entry.install_path.join("SKILL.md").exists());
        assert!(manager.registry().exists("kalshi-markets"));
        // Staging directory cleaned up
        let leftovers: Vec<_> = fs::read_dir(manager.skills_root())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".staging"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_untrusted_external_install_fails_without_mutation() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp, MockVcs::new("weather", &["rev1"]));

        let err = manager
            .install("https://example.com/weather.git", None, None, false)
            .unwrap_err();
        assert!(matches!(err, SkillError::Security(_)));
        assert!(!manager.skills_root().join("weather").exists());
        assert_eq!(manager.list().len(), 0);
    }

    #[test]
    fn test_duplicate_install_fails_cleanly() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp, MockVcs::new("weather", &["rev1", "rev2"]));

        manager.install("https://example.com/a.git", None, None, true).unwrap();
        let err = manager
            .install("https://example.com/b.git", None, None, true)
            .unwrap_err();

        assert!(matches!(err, SkillError::DuplicateName(_)));
        assert_eq!(manager.list().len(), 1);
        assert_eq!(manager.registry().get("weather").unwrap().revision, "rev1");
    }

    #[test]
    fn test_update_repins_revision_only() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp, MockVcs::new("weather", &["rev1", "rev2"]));

        let installed = manager.install("https://example.com/w.git", None, None, true).unwrap();
        let updated = manager.update("weather").unwrap();

        assert_eq!(updated.revision, "rev2");
        assert_eq!(updated.installed_at, installed[0].installed_at);
        assert_eq!(updated.source_url, installed[0].source_url);
    }

    #[test]
    fn test_update_bundled_fails() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp, MockVcs::new("weather", &["rev1"]));

        let bundled = temp.path().join("bundled-weather");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join("SKILL.md"), "---\nname: weather\ndescription: d\n---\nbody").unwrap();
        manager.install_bundled(&bundled).unwrap();

        let err = manager.update("weather").unwrap_err();
        assert!(matches!(err, SkillError::Security(_)));
    }

    #[test]
    fn test_remove_deletes_directory_and_entry() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp, MockVcs::new("weather", &["rev1"]));

        let entries = manager.install("https://example.com/w.git", None, None, true).unwrap();
        let path = entries[0].install_path.clone();

        manager.remove("weather").unwrap();
        assert!(!path.exists());
        assert!(!manager.registry().exists("weather"));
    }

    #[test]
    fn test_remove_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp, MockVcs::new("weather", &["rev1"]));

        let err = manager.remove("ghost").unwrap_err();
        assert!(matches!(err, SkillError::NotFound(_)));
        assert_eq!(manager.list().len(), 0);
    }

    #[test]
    fn test_remove_with_orphaned_entry_recovers() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp, MockVcs::new("weather", &["rev1"]));

        let entries = manager.install("https://example.com/w.git", None, None, true).unwrap();
        // Simulate a crash that deleted the directory but kept the entry
        fs::remove_dir_all(&entries[0].install_path).unwrap();
        assert!(manager.registry().exists("weather"));

        manager.remove("weather").unwrap();
        assert!(!manager.registry().exists("weather"));
    }

    #[test]
    fn test_info_merges_registry_and_manifest() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp, MockVcs::new("weather", &["rev1"]));

        manager.install("https://example.com/w.git", None, None, true).unwrap();
        let info = manager.info("weather").unwrap();

        assert_eq!(info.canonical_name, "weather");
        assert_eq!(info.revision, "rev1");
        assert_eq!(info.description, "A mock skill");
        assert_eq!(info.script_count, 0);
        assert_eq!(info.source_url.as_deref(), Some("https://example.com/w.git"));
    }

    #[test]
    fn test_bundled_install_is_auto_trusted() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp, MockVcs::new("unused", &["rev1"]));

        let bundled = temp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join("SKILL.md"), "---\nname: notes\ndescription: d\n---\nbody").unwrap();

        let entry = manager.install_bundled(&bundled).unwrap();
        assert!(entry.trusted);
        assert!(entry.source_url.is_none());
        assert_eq!(entry.install_path, bundled);
    }
}
