//! Skill discovery and loading from installed-skill directories.
//!
//! The loader walks the bundled and registered skill locations at agent
//! startup, producing unresolved toolset references and script listings, and
//! feeding manifests into the documentation index. A single skill that fails
//! to load is logged and skipped; bulk loading never aborts.

use crate::error::Result;
use crate::manifest::{SKILL_FILE, SkillManifest};
use crate::security;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use stratus_core::SkillsConfig;
use tracing::warn;
use walkdir::WalkDir;

/// Subdirectory of a skill that holds its auxiliary scripts.
pub const SCRIPTS_DIR: &str = "scripts";

/// Sentinel selection value meaning "no skills enabled".
pub const SELECTION_NONE: &str = "none";

/// A discovered auxiliary script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRef {
    /// File name of the script (e.g., "fetch.py")
    pub name: String,

    /// Absolute path to the script
    pub path: PathBuf,
}

/// Everything loading one skill directory yields.
#[derive(Debug, Clone)]
pub struct LoadedSkill {
    /// The validated manifest
    pub manifest: SkillManifest,

    /// Declared `module:Class` references, unresolved. Instantiation
    /// belongs to the toolset registry
    pub toolset_refs: Vec<String>,

    /// Discovered auxiliary scripts
    pub scripts: Vec<ScriptRef>,
}

/// Immediate subdirectories of `root` that contain a declaration file.
/// A nonexistent root is an empty list, not an error.
pub fn scan_directory(root: &Path) -> Vec<PathBuf> {
    if !root.exists() {
        return Vec::new();
    }

    let mut candidates: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir() && e.path().join(SKILL_FILE).exists())
        .map(|e| e.into_path())
        .collect();

    candidates.sort();
    candidates
}

/// Resolve a skill's auxiliary scripts under its `scripts/` subdirectory.
///
/// When the manifest lists explicit script names, each is resolved accepting
/// either the bare name or the name with its suffix; names that resolve to
/// nothing are logged and skipped. Otherwise every python file there is
/// discovered, minus anything matching the manifest's ignore globs. A
/// missing scripts directory yields an empty list.
pub fn discover_scripts(skill_path: &Path, manifest: &SkillManifest) -> Result<Vec<ScriptRef>> {
    let scripts_dir = skill_path.join(SCRIPTS_DIR);
    if !scripts_dir.is_dir() {
        return Ok(Vec::new());
    }

    if let Some(names) = &manifest.scripts {
        let mut scripts = Vec::new();
        for name in names {
            let normalized = security::normalize_script_name(name);
            let candidate = scripts_dir.join(&normalized);
            if candidate.is_file() {
                scripts.push(ScriptRef { name: normalized, path: candidate });
            } else {
                warn!(skill = %manifest.name, script = %name, "declared script not found, skipping");
            }
        }
        return Ok(scripts);
    }

    let ignore: Vec<glob::Pattern> = manifest
        .ignore
        .iter()
        .filter_map(|pattern| match glob::Pattern::new(pattern) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(skill = %manifest.name, pattern = %pattern, error = %e, "bad ignore glob, skipping");
                None
            }
        })
        .collect();

    let mut scripts: Vec<ScriptRef> = std::fs::read_dir(&scripts_dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            if !name.to_lowercase().ends_with(".py") {
                return None;
            }
            if ignore.iter().any(|p| p.matches(&name)) {
                return None;
            }
            Some(ScriptRef { name, path: e.path() })
        })
        .collect();

    scripts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(scripts)
}

/// Parse one skill directory into its manifest, unresolved toolset
/// references, and discovered scripts.
pub fn load_skill(path: &Path) -> Result<LoadedSkill> {
    let manifest = SkillManifest::parse(path)?;
    let scripts = discover_scripts(path, &manifest)?;
    let toolset_refs = manifest.toolsets.clone();

    Ok(LoadedSkill { manifest, toolset_refs, scripts })
}

/// Loads skills from an ordered list of root directories.
#[derive(Debug, Clone)]
pub struct SkillLoader {
    roots: Vec<PathBuf>,
}

impl SkillLoader {
    /// Loader over explicit root directories, searched in order.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Loader configured from the `[skills]` config section: the configured
    /// directory when set, else the default per-user root. A disabled
    /// subsystem yields a loader with no roots, so nothing is discovered.
    pub fn from_config(config: &SkillsConfig) -> Self {
        if !config.enabled {
            return Self::new(Vec::new());
        }

        match &config.skills_dir {
            Some(dir) => Self::new(vec![dir.clone()]),
            None => Self::with_default_root(),
        }
    }

    /// Loader over the default per-user skills root (`~/.stratus/skills`).
    pub fn with_default_root() -> Self {
        let root = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".stratus")
            .join("skills");
        Self::new(vec![root])
    }

    /// All candidate skill directories across the roots.
    pub fn discover(&self) -> Vec<PathBuf> {
        self.roots.iter().flat_map(|root| scan_directory(root)).collect()
    }

    /// Load every discoverable skill, skipping (and logging) failures.
    pub fn load_all(&self) -> Vec<LoadedSkill> {
        self.discover()
            .iter()
            .filter_map(|path| match load_skill(path) {
                Ok(loaded) => Some(loaded),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load skill, skipping");
                    None
                }
            })
            .collect()
    }

    /// Load the selected skills, aggregating their toolset references and a
    /// per-skill script index.
    ///
    /// An absent selection, an empty one, or the sentinel `"none"` yields an
    /// empty result with no error. Individual load failures are logged and
    /// skipped.
    pub fn load_enabled(&self, selection: Option<&[String]>) -> (Vec<String>, BTreeMap<String, Vec<ScriptRef>>) {
        let mut toolsets = Vec::new();
        let mut script_index = BTreeMap::new();

        let Some(selection) = selection else {
            return (toolsets, script_index);
        };

        if selection.iter().any(|s| s.eq_ignore_ascii_case(SELECTION_NONE)) {
            return (toolsets, script_index);
        }

        for name in selection {
            let Some(path) = self.find_skill_dir(name) else {
                warn!(skill = %name, "enabled skill not found in any root, skipping");
                continue;
            };

            match load_skill(&path) {
                Ok(loaded) => {
                    toolsets.extend(loaded.toolset_refs);
                    script_index.insert(loaded.manifest.name.clone(), loaded.scripts);
                }
                Err(e) => {
                    warn!(skill = %name, error = %e, "failed to load enabled skill, skipping");
                }
            }
        }

        (toolsets, script_index)
    }

    /// Locate a skill directory by name: first the canonical directory under
    /// each root, then a scan matching declared manifest names.
    fn find_skill_dir(&self, name: &str) -> Option<PathBuf> {
        let canonical = security::normalize(name).ok()?;

        for root in &self.roots {
            let direct = root.join(&canonical);
            if direct.join(SKILL_FILE).exists() {
                return Some(direct);
            }
        }

        for candidate in self.discover() {
            if let Ok(manifest) = SkillManifest::parse(&candidate)
                && security::normalize(&manifest.name).ok().as_deref() == Some(canonical.as_str())
            {
                return Some(candidate);
            }
        }

        None
    }
}
