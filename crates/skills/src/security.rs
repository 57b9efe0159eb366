//! Name sanitization and install trust policy.
//!
//! Skill names become directory names under the skills root, so everything
//! here is written to make path traversal impossible: a name that survives
//! [`sanitize`] can be joined onto the root without escaping it.

use crate::error::{Result, SkillError};

/// Maximum length of a skill name.
pub const MAX_NAME_LEN: usize = 64;

/// Names that may never be used as skill identifiers.
const RESERVED_NAMES: &[&str] = &[".", "..", "~", "__pycache__", ".git", ".cache", "node_modules"];

/// Validate a skill name without modifying it.
///
/// Rejects reserved tokens, traversal sequences, embedded whitespace, and
/// anything outside `[A-Za-z0-9_-]{1,64}`. Returns the input on success.
pub fn sanitize(name: &str) -> Result<&str> {
    if name.is_empty() {
        return Err(SkillError::Security("skill name is empty".to_string()));
    }

    if RESERVED_NAMES.contains(&name) {
        return Err(SkillError::Security(format!("skill name '{}' is reserved", name)));
    }

    if name.contains("..") {
        return Err(SkillError::Security(format!(
            "skill name '{}' contains a path traversal sequence",
            name
        )));
    }

    if name.starts_with('/') || name.starts_with('\\') {
        return Err(SkillError::Security(format!(
            "skill name '{}' must not start with a path separator",
            name
        )));
    }

    if name.chars().any(char::is_whitespace) {
        return Err(SkillError::Security(format!("skill name '{}' contains whitespace", name)));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(SkillError::Security(format!(
            "skill name '{}' exceeds {} characters",
            name, MAX_NAME_LEN
        )));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(SkillError::Security(format!(
            "skill name '{}' must contain only letters, digits, hyphens, and underscores",
            name
        )));
    }

    Ok(name)
}

/// Canonicalize a skill name: sanitize, lowercase, `_` becomes `-`.
///
/// `Kalshi_Markets`, `kalshi-markets`, and `KALSHI-MARKETS` all normalize to
/// the same canonical form, which is the unique registry key.
pub fn normalize(name: &str) -> Result<String> {
    let name = sanitize(name)?;
    Ok(name.to_lowercase().replace('_', "-"))
}

/// Canonicalize a script name: lowercase, `.py` appended if absent.
pub fn normalize_script_name(name: &str) -> String {
    let lower = name.to_lowercase();
    if lower.ends_with(".py") { lower } else { format!("{}.py", lower) }
}

/// Trust policy consulted before installation.
///
/// Bundled skills (no external source) are auto-trusted. Externally sourced
/// skills require the caller to assert trust explicitly; without it the
/// install fails before any filesystem mutation.
pub fn confirm_untrusted_install(name: &str, source: Option<&str>, trusted: bool) -> Result<bool> {
    match source {
        None => Ok(true),
        Some(_) if trusted => Ok(true),
        Some(source) => Err(SkillError::Security(format!(
            "skill '{}' from {} is untrusted; pass an explicit trust flag after vetting the source",
            name, source
        ))),
    }
}
