//! Error taxonomy for skill operations.

use thiserror::Error;

/// Errors that can occur when working with skills.
#[derive(Debug, Error)]
pub enum SkillError {
    /// Referenced skill absent from the registry or the filesystem.
    #[error("skill not found: {0}")]
    NotFound(String),

    /// SKILL.md missing, malformed, or schema-invalid.
    #[error("invalid manifest: {0}")]
    Manifest(String),

    /// Declared compatibility bounds unmet.
    #[error("dependency error: {0}")]
    Dependency(String),

    /// Name sanitization or revision-pinning failure.
    #[error("security error: {0}")]
    Security(String),

    /// A skill with the same canonical name is already registered.
    #[error("skill already registered: {0}")]
    DuplicateName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for skill operations.
pub type Result<T> = std::result::Result<T, SkillError>;

impl From<SkillError> for stratus_core::Error {
    fn from(err: SkillError) -> Self {
        stratus_core::Error::Other(err.to_string())
    }
}
