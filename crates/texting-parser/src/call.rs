use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::{
    error::{Result, TextingError},
    grammar::Grammar,
    mentions::extract_mentions,
};

/// Number of hex digits kept from the call digest.
pub const CALL_ID_LEN: usize = 12;

/// A completed call as collected by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRecord {
    pub call_id: String,
    /// Target of the call, trailing dots trimmed.
    pub first_mention: String,
    /// Raw headline text, starting with the mention as written.
    pub head_line: String,
    /// Raw body content, `None` for bodyless calls.
    pub body: Option<String>,
    /// Literal opening line of a fenced body.
    pub body_fence: Option<String>,
}

impl CallRecord {
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub fn is_fenced(&self) -> bool {
        self.body_fence.is_some()
    }

    /// Every mention in the headline, the first mention included.
    pub fn mentions(&self, grammar: &Grammar) -> Vec<String> {
        let sigil = grammar.mention_sigil();
        extract_mentions(&format!("{sigil}{}", self.head_line), grammar)
    }
}

/// The in-progress call while the state machine is inside one.
#[derive(Debug, Default)]
pub struct CallAccumulator {
    first_mention: Option<String>,
    head_line: String,
    body: Option<String>,
    body_fence: Option<String>,
}

impl CallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first_mention(&self) -> Option<&str> {
        self.first_mention.as_deref()
    }

    /// Freezes the call target. Reporting the same mention again is
    /// harmless; a different one means the open call was corrupted.
    pub fn set_first_mention(&mut self, mention: &str) -> Result<()> {
        match &self.first_mention {
            Some(previous) if previous != mention => Err(TextingError::MentionConflict {
                previous: previous.clone(),
                next: mention.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.first_mention = Some(mention.to_string());
                Ok(())
            }
        }
    }

    pub fn push_head_line(&mut self, text: &str) {
        self.head_line.push_str(text);
    }

    pub fn start_body(&mut self, fence: Option<&str>) {
        self.body = Some(String::new());
        self.body_fence = fence.map(str::to_string);
    }

    pub fn push_body(&mut self, text: &str) {
        self.body.get_or_insert_with(String::new).push_str(text);
    }

    /// Computes the call id and hands out the finished record, leaving the
    /// accumulator empty for the next call.
    pub fn finish(&mut self, counter: u64) -> CallRecord {
        let acc = std::mem::take(self);
        let first_mention = acc.first_mention.unwrap_or_default();
        let call_id = call_id(&first_mention, &acc.head_line, acc.body.as_deref(), counter);
        CallRecord {
            call_id,
            first_mention,
            head_line: acc.head_line,
            body: acc.body,
            body_fence: acc.body_fence,
        }
    }
}

/// Short deterministic digest of a call's normalized content.
///
/// `counter` only feeds the hash, so two identical calls in one session get
/// different ids while a replay of the same session reproduces them.
pub fn call_id(first_mention: &str, head_line: &str, body: Option<&str>, counter: u64) -> String {
    let mut normalized = String::new();
    for part in [first_mention, head_line, body.unwrap_or_default()] {
        normalized.push_str(normalize(part).trim_end());
        normalized.push('\u{1f}');
    }

    let mut hasher = DefaultHasher::new();
    normalized.hash(&mut hasher);
    counter.hash(&mut hasher);

    let mut id = format!("{:016x}", hasher.finish());
    id.truncate(CALL_ID_LEN);
    id
}

fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
