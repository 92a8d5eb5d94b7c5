//! # Grammar Variants
//!
//! The texting format has shipped two marker conventions. Both are the same
//! grammar with different delimiter literals, so they are modelled as one
//! value rather than two parsers:
//!
//! - **prefixed** (default): calls start with `!!@mention` and end with `!!@/`
//! - **bare** (legacy): calls start with `@mention` and end with `@/`
//!
//! All delimiter knowledge lives here. The state machine and the mention
//! extractor ask the grammar; they never hardcode `!!@` or `` ` ``.

use serde::{Deserialize, Serialize};

use crate::{
    classify::is_mention_char,
    error::{Result, TextingError},
};

/// Delimiter literals for one grammar variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Grammar {
    /// Column-zero marker that opens a call when followed by a mention start.
    pub call_marker: String,
    /// Column-zero marker that explicitly closes the open call.
    pub terminator: String,
    /// Shortest backtick run that counts as a fence.
    pub min_fence_len: usize,
}

impl Grammar {
    /// The backtick character used for inline quoting and fences.
    pub const TICK: char = '`';

    pub fn prefixed() -> Self {
        Self {
            call_marker: "!!@".to_string(),
            terminator: "!!@/".to_string(),
            min_fence_len: 3,
        }
    }

    pub fn bare() -> Self {
        Self {
            call_marker: "@".to_string(),
            terminator: "@/".to_string(),
            min_fence_len: 3,
        }
    }

    /// The character that introduces a mention: the last character of the
    /// call marker.
    pub fn mention_sigil(&self) -> char {
        self.call_marker.chars().last().unwrap_or('@')
    }

    /// Checks that the delimiters can be told apart from content and from
    /// each other.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Err(TextingError::InvalidGrammar(reason.to_string()));

        if self.call_marker.is_empty() {
            return invalid("call marker is empty");
        }
        if self.terminator.is_empty() {
            return invalid("terminator is empty");
        }
        if self.call_marker.starts_with(&self.terminator) {
            return invalid("terminator must not be a prefix of the call marker");
        }
        for (name, literal) in [("call marker", &self.call_marker), ("terminator", &self.terminator)] {
            if literal.starts_with(Self::TICK) || literal.starts_with(char::is_whitespace) {
                return invalid(&format!("{name} must not start with a backtick or whitespace"));
            }
            if literal.contains('\n') {
                return invalid(&format!("{name} must not contain a line break"));
            }
        }
        if is_mention_char(self.mention_sigil()) {
            return invalid("call marker must end with a mention sigil, not a mention character");
        }
        if self.min_fence_len < 2 {
            return invalid("fences must be at least two backticks long");
        }
        Ok(())
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Self::prefixed()
    }
}
