//! Per-turn progressive disclosure of skill documentation.
//!
//! Given the conversation so far, the provider decides which tier of skill
//! documentation, if any, to inject into the model's context. Tiers trade
//! token cost against discoverability: full documentation only when
//! lexically justified or explicitly requested, a one-line breadcrumb once
//! triggers exist, and the brief registry when lexical matching would be
//! meaningless because no skill declares triggers.
//!
//! This runs inline on the turn-processing path: in-memory regex work only,
//! no I/O, and it never raises. Any internal failure degrades to injecting
//! nothing.

use crate::docs::{DocIndex, SkillDocs};
use regex::Regex;
use std::sync::LazyLock;
use stratus_core::SkillsConfig;

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One message of the conversation, as seen by the turn pipeline.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Fixed phrasings that ask for the capability overview.
static CAPABILITY_INTENTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bwhat can you do\b",
        r"(?i)\bwhat are your (capabilities|skills)\b",
        r"(?i)\bwhat (skills|abilities) do you have\b",
        r"(?i)\blist (your )?skills\b",
        r"(?i)\bwhat do you know how to do\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static intent pattern"))
    .collect()
});

/// Fixed phrasings that ask for everything in detail.
static FULL_DOCS_INTENTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bshow (me )?(all|every) (the )?skills?\b",
        r"(?i)\bshow me everything\b",
        r"(?i)\b(all|full) skill (docs|documentation|details)\b",
        r"(?i)\bskills? in (full|detail)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static intent pattern"))
    .collect()
});

/// Decides what skill documentation to surface each turn.
#[derive(Debug, Clone)]
pub struct ContextProvider {
    index: DocIndex,
    full_docs_cap: usize,
    match_cap: usize,
}

impl ContextProvider {
    /// Provider over a documentation index with explicit caps.
    pub fn new(index: DocIndex, full_docs_cap: usize, match_cap: usize) -> Self {
        Self { index, full_docs_cap: full_docs_cap.max(1), match_cap: match_cap.max(1) }
    }

    /// Provider configured from the `[skills]` config section.
    pub fn from_config(index: DocIndex, config: &SkillsConfig) -> Self {
        Self::new(index, config.full_docs_cap, config.match_cap)
    }

    /// The documentation index backing this provider.
    pub fn index(&self) -> &DocIndex {
        &self.index
    }

    /// Instruction text to merge into the model's context for this turn, if
    /// any. Never errors; internal failures degrade to `None`.
    pub fn additional_context(&self, messages: &[ChatMessage]) -> Option<String> {
        let message = latest_user_message(messages)?;

        if !self.index.has_skills() {
            return None;
        }

        if CAPABILITY_INTENTS.iter().any(|p| p.is_match(message)) {
            return Some(self.brief_registry());
        }

        if FULL_DOCS_INTENTS.iter().any(|p| p.is_match(message)) {
            return Some(self.full_documentation());
        }

        let skills = self.index.all_metadata();
        let any_declared = skills.iter().any(|s| !s.triggers.declared_empty(&s.name));

        // With no declared triggers anywhere, lexical matching is
        // meaningless; keep skills discoverable via the registry instead.
        if !any_declared {
            return Some(self.brief_registry());
        }

        let message_lower = message.to_lowercase();
        let matched: Vec<&SkillDocs> = skills
            .iter()
            .filter(|s| skill_matches(s, &message_lower))
            .copied()
            .collect();

        if matched.is_empty() {
            return Some(self.breadcrumb());
        }

        Some(self.matched_instructions(&matched))
    }

    /// Tier: one line per skill plus a hint that scripts are invokable.
    fn brief_registry(&self) -> String {
        let mut out = String::from("Available skills:\n");
        for docs in self.index.all_metadata() {
            out.push_str(&format!("{}: {}\n", docs.name, docs.brief_description));
        }
        out.push_str("Skill scripts can be run on request.");
        out
    }

    /// Tier: full documentation for up to `full_docs_cap` skills.
    fn full_documentation(&self) -> String {
        let skills = self.index.all_metadata();
        let shown = skills.len().min(self.full_docs_cap);

        let mut out = String::new();
        for docs in &skills[..shown] {
            out.push_str(&format!("## Skill: {}\n{}\n\n", docs.name, docs.instructions));
        }

        if skills.len() > shown {
            out.push_str(&format!("({} more skills not shown)", skills.len() - shown));
        }

        out.trim_end().to_string()
    }

    /// Tier: full instructions for up to `match_cap` matched skills, in
    /// match discovery order.
    fn matched_instructions(&self, matched: &[&SkillDocs]) -> String {
        let mut out = String::new();
        for docs in matched.iter().take(self.match_cap) {
            out.push_str(&format!("## Skill: {}\n{}\n\n", docs.name, docs.instructions));
        }
        out.trim_end().to_string()
    }

    /// Tier: minimal marker that skills exist, skill count only.
    fn breadcrumb(&self) -> String {
        format!("({} skills available)", self.index.count())
    }
}

/// The most recent non-empty user message.
fn latest_user_message(messages: &[ChatMessage]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.trim())
        .filter(|content| !content.is_empty())
}

/// Whether one skill's triggers fire against the lower-cased message.
///
/// Strategies run in order (name, keywords, verbs, regex patterns) and the
/// first that fires wins, so a skill matches at most once. Patterns were
/// compiled when the docs were indexed; malformed ones are already gone.
fn skill_matches(docs: &SkillDocs, message_lower: &str) -> bool {
    if contains_word(message_lower, &docs.name.to_lowercase()) {
        return true;
    }

    if docs.triggers.keywords.iter().any(|k| contains_word(message_lower, k)) {
        return true;
    }

    if docs.triggers.verbs.iter().any(|v| contains_word(message_lower, v)) {
        return true;
    }

    docs.pattern_matchers.iter().any(|regex| regex.is_match(message_lower))
}

/// Whole-word containment; `-` and `_` count as word characters so
/// hyphenated skill names match as a unit.
fn contains_word(text: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }

    let is_word_char = |c: char| c.is_alphanumeric() || c == '-' || c == '_';
    let mut start = 0;

    while let Some(pos) = text[start..].find(word) {
        let begin = start + pos;
        let end = begin + word.len();

        let left_ok = begin == 0 || !text[..begin].chars().next_back().is_some_and(is_word_char);
        let right_ok = end == text.len() || !text[end..].chars().next().is_some_and(is_word_char);

        if left_ok && right_ok {
            return true;
        }

        // Advance past the first character of the rejected match; one byte
        // would land inside a multibyte character and panic the next slice.
        start = begin + text[begin..].chars().next().map_or(1, char::len_utf8);
    }

    false
}
