//! Skill management and progressive disclosure for the stratus agent.
//!
//! Skills are installable capability packages: a `SKILL.md` manifest with
//! YAML frontmatter, optional in-process toolsets, and optional python
//! scripts. This crate covers the whole lifecycle (install from git,
//! validate, register, load at startup) plus the per-turn decision of how
//! much skill documentation to surface into the model's context.

pub mod context;
pub mod docs;
pub mod error;
pub mod exec;
pub mod loader;
pub mod manager;
pub mod manifest;
pub mod registry;
pub mod security;
pub mod toolset;
pub mod vcs;

pub use context::{ChatMessage, ContextProvider, Role};
pub use docs::{DocIndex, SkillDocs};
pub use error::{Result, SkillError};
pub use exec::{ExecError, ScriptOutcome, ScriptRunner};
pub use loader::{LoadedSkill, ScriptRef, SkillLoader};
pub use manager::{SkillInfo, SkillManager};
pub use manifest::{CompatBounds, SkillManifest, TriggerSet};
pub use registry::{RegistryEntry, SkillRegistry};
pub use toolset::{Toolset, ToolsetRegistry};
pub use vcs::{GitBackend, VersionControl};
