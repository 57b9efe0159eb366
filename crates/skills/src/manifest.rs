//! Parser for SKILL.md declaration files.
//!
//! SKILL.md format:
//! ```markdown
//! ---
//! name: kalshi-markets
//! description: Query Kalshi prediction markets
//! version: 1.0.0
//! triggers:
//!   keywords:
//!     - kalshi
//!   verbs:
//!     - bet
//! ---
//!
//! # Kalshi Markets
//!
//! Instructions the model sees when this skill is surfaced...
//! ```
//!
//! The YAML header is the structured descriptor; everything after the second
//! `---` is the skill's free-text instructions. Validation is eager and
//! reports every violation in a single error rather than failing on the
//! first.

use crate::error::{Result, SkillError};
use crate::security;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

/// Declaration file name inside a skill directory.
pub const SKILL_FILE: &str = "SKILL.md";

/// Frontmatter delimiter.
const MARKER: &str = "---";

/// Maximum length of a skill description.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Maximum length of a derived brief description.
const BRIEF_LEN: usize = 80;

/// Agent version bounds a skill declares itself compatible with.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CompatBounds {
    /// Minimum agent version (inclusive), dotted numeric like "0.4"
    #[serde(default)]
    pub min_agent_version: Option<String>,

    /// Maximum agent version (inclusive)
    #[serde(default)]
    pub max_agent_version: Option<String>,
}

impl CompatBounds {
    /// Check the bounds against the host agent version.
    pub fn check(&self, host_version: &str) -> Result<()> {
        if let Some(min) = &self.min_agent_version
            && cmp_versions(host_version, min) == Ordering::Less
        {
            return Err(SkillError::Dependency(format!(
                "requires agent version >= {}, host is {}",
                min, host_version
            )));
        }

        if let Some(max) = &self.max_agent_version
            && cmp_versions(host_version, max) == Ordering::Greater
        {
            return Err(SkillError::Dependency(format!(
                "requires agent version <= {}, host is {}",
                max, host_version
            )));
        }

        Ok(())
    }
}

/// Compare dotted numeric versions segment by segment; missing segments
/// count as zero, non-numeric segments compare as zero.
fn cmp_versions(a: &str, b: &str) -> Ordering {
    let parse = |s: &str| -> Vec<u64> { s.split('.').map(|seg| seg.trim().parse().unwrap_or(0)).collect() };
    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());

    for i in 0..len {
        let (x, y) = (a.get(i).copied().unwrap_or(0), b.get(i).copied().unwrap_or(0));
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    Ordering::Equal
}

/// Lexical rules that make a skill's documentation relevant to a message.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TriggerSet {
    /// Whole-word keywords (lowercase; the skill name is always included)
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Whole-word action verbs (lowercase)
    #[serde(default)]
    pub verbs: Vec<String>,

    /// Case-insensitive regex patterns
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl TriggerSet {
    /// True when the skill declares no structured triggers of its own.
    ///
    /// The implicit name keyword does not count; a skill with only that
    /// falls back to name-only matching.
    pub fn declared_empty(&self, name: &str) -> bool {
        let canonical = name.to_lowercase();
        self.keywords.iter().all(|k| *k == canonical) && self.verbs.is_empty() && self.patterns.is_empty()
    }
}

/// Declarative descriptor of one skill, built from SKILL.md.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkillManifest {
    /// Canonical identifier, 1-64 chars of `[A-Za-z0-9_-]`
    pub name: String,

    /// What the skill does (max 500 chars)
    pub description: String,

    /// Semantic version
    #[serde(default)]
    pub version: Option<String>,

    /// Maintainer
    #[serde(default)]
    pub author: Option<String>,

    /// Upstream repository URL
    #[serde(default)]
    pub repository: Option<String>,

    /// License identifier
    #[serde(default)]
    pub license: Option<String>,

    /// Agent version compatibility bounds
    #[serde(default)]
    pub compat: Option<CompatBounds>,

    /// In-process toolset references, `module:Class`-style strings
    #[serde(default)]
    pub toolsets: Vec<String>,

    /// Explicit script names; absent means auto-discover under scripts/
    #[serde(default)]
    pub scripts: Option<Vec<String>>,

    /// Glob patterns excluded from script auto-discovery
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Environment variables scripts may read
    #[serde(default)]
    pub env: Vec<String>,

    /// Free-text instructions (SKILL.md body)
    pub instructions: String,

    /// First sentence or word-boundary prefix of the description
    pub brief_description: String,

    /// Trigger rules, with the skill name as an implicit keyword
    pub triggers: TriggerSet,

    /// Path to the skill directory
    #[serde(skip)]
    pub path: PathBuf,
}

impl SkillManifest {
    /// Parse the SKILL.md in `skill_dir` into a validated manifest.
    pub fn parse(skill_dir: &Path) -> Result<SkillManifest> {
        let skill_md = skill_dir.join(SKILL_FILE);

        if !skill_md.exists() {
            return Err(SkillError::Manifest(format!("{} not found", skill_md.display())));
        }

        let bytes = fs::read(&skill_md)?;
        let content = String::from_utf8(bytes)
            .map_err(|_| SkillError::Manifest(format!("{} is not valid UTF-8", skill_md.display())))?;

        let (raw, instructions) = extract_frontmatter(&content)?;
        build_manifest(raw, instructions, skill_dir)
    }

    /// Check compatibility bounds against the host agent version.
    pub fn check_compat(&self, host_version: &str) -> Result<()> {
        match &self.compat {
            Some(bounds) => bounds
                .check(host_version)
                .map_err(|e| SkillError::Dependency(format!("skill '{}': {}", self.name, e))),
            None => Ok(()),
        }
    }
}

/// Split SKILL.md content into its raw header and the instructions body.
pub fn extract_frontmatter(content: &str) -> Result<(RawFrontmatter, String)> {
    if !content.starts_with(MARKER) {
        return Err(SkillError::Manifest(format!("{} must start with '{}'", SKILL_FILE, MARKER)));
    }

    let rest = &content[MARKER.len()..];
    let header_end = rest
        .find(MARKER)
        .ok_or_else(|| SkillError::Manifest(format!("closing '{}' not found", MARKER)))?;

    let header = &rest[..header_end];
    let body = &rest[header_end + MARKER.len()..];

    let value: serde_yml::Value = serde_yml::from_str(header)
        .map_err(|e| SkillError::Manifest(format!("YAML parse error in frontmatter: {e}")))?;

    if !value.is_mapping() {
        return Err(SkillError::Manifest("frontmatter is not a key/value map".to_string()));
    }

    let raw: RawFrontmatter = serde_yml::from_value(value)
        .map_err(|e| SkillError::Manifest(format!("invalid frontmatter field: {e}")))?;

    Ok((raw, body.trim().to_string()))
}

/// Validate the raw header and assemble the manifest, collecting every
/// violation into a single error.
fn build_manifest(raw: RawFrontmatter, instructions: String, skill_dir: &Path) -> Result<SkillManifest> {
    let mut violations = Vec::new();

    if let Err(e) = security::sanitize(&raw.name) {
        violations.push(format!("name: {e}"));
    }

    if raw.description.is_empty() {
        violations.push("description: required".to_string());
    } else if raw.description.chars().count() > MAX_DESCRIPTION_LEN {
        violations.push(format!(
            "description: exceeds {} characters ({})",
            MAX_DESCRIPTION_LEN,
            raw.description.chars().count()
        ));
    }

    for toolset in &raw.toolsets {
        let mut parts = toolset.splitn(2, ':');
        let module = parts.next().unwrap_or("");
        let class = parts.next().unwrap_or("");
        if module.is_empty() || class.is_empty() {
            violations.push(format!("toolsets: '{}' is not a module:Class reference", toolset));
        }
    }

    if let Some(scripts) = &raw.scripts {
        for script in scripts {
            if script.is_empty() || script.contains('/') || script.contains('\\') || script.contains("..") {
                violations.push(format!("scripts: '{}' is not a bare file name", script));
            }
        }
    }

    if !violations.is_empty() {
        return Err(SkillError::Manifest(format!(
            "{}: {}",
            skill_dir.join(SKILL_FILE).display(),
            violations.join("; ")
        )));
    }

    let brief_description = derive_brief(&raw.description);
    let triggers = derive_triggers(&raw.name, raw.triggers);

    Ok(SkillManifest {
        name: raw.name,
        description: raw.description,
        version: raw.version,
        author: raw.author,
        repository: raw.repository,
        license: raw.license,
        compat: raw.compat,
        toolsets: raw.toolsets,
        scripts: raw.scripts,
        ignore: raw.ignore,
        env: raw.env,
        instructions,
        brief_description,
        triggers,
        path: skill_dir.to_path_buf(),
    })
}

/// First sentence of the description, else a word-boundary prefix. Lengths
/// are counted in chars.
fn derive_brief(description: &str) -> String {
    if let Some(end) = description.find(['.', '!', '?']) {
        let sentence = description[..end].trim();
        if !sentence.is_empty() && sentence.chars().count() <= BRIEF_LEN {
            return sentence.to_string();
        }
    }

    if description.chars().count() <= BRIEF_LEN {
        return description.trim().to_string();
    }

    let prefix: String = description.chars().take(BRIEF_LEN).collect();
    match prefix.rfind(char::is_whitespace) {
        Some(space) if space > 0 => prefix[..space].trim_end().to_string(),
        _ => prefix,
    }
}

/// Lowercase declared triggers and add the skill name as an implicit
/// keyword, without duplication.
fn derive_triggers(name: &str, raw: Option<RawTriggers>) -> TriggerSet {
    let raw = raw.unwrap_or_default();
    let mut keywords: Vec<String> = raw.keywords.iter().map(|k| k.to_lowercase()).collect();

    let implicit = name.to_lowercase();
    if !keywords.iter().any(|k| *k == implicit) {
        keywords.push(implicit);
    }

    TriggerSet {
        keywords,
        verbs: raw.verbs.iter().map(|v| v.to_lowercase()).collect(),
        patterns: raw.patterns,
    }
}

/// YAML frontmatter structure as written in SKILL.md.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawFrontmatter {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub repository: Option<String>,

    #[serde(default)]
    pub license: Option<String>,

    #[serde(default)]
    pub compat: Option<CompatBounds>,

    #[serde(default)]
    pub toolsets: Vec<String>,

    #[serde(default)]
    pub scripts: Option<Vec<String>>,

    #[serde(default)]
    pub ignore: Vec<String>,

    #[serde(default)]
    pub env: Vec<String>,

    #[serde(default)]
    pub triggers: Option<RawTriggers>,
}

/// Trigger lists as written in frontmatter.
#[derive(Debug, Default, Deserialize)]
pub struct RawTriggers {
    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub verbs: Vec<String>,

    #[serde(default)]
    pub patterns: Vec<String>,
}
