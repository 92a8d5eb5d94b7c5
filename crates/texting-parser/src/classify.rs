use crate::grammar::Grammar;

/// The role a single character can play in the texting grammar.
///
/// Classification is context-free: whether a `Marker` character really opens
/// a call depends on column position and the following characters, which is
/// the state machine's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// First character of the call marker or the terminator.
    Marker,
    /// `\n`, the only line break.
    LineBreak,
    /// Horizontal whitespace (space, tab, carriage return).
    Space,
    /// A backtick, for inline quoting and fences.
    Backtick,
    Other,
}

/// Maps a character to its [`CharClass`] under `grammar`.
pub fn classify(ch: char, grammar: &Grammar) -> CharClass {
    match ch {
        '\n' => CharClass::LineBreak,
        ' ' | '\t' | '\r' => CharClass::Space,
        Grammar::TICK => CharClass::Backtick,
        _ if grammar.call_marker.starts_with(ch) || grammar.terminator.starts_with(ch) => {
            CharClass::Marker
        }
        _ => CharClass::Other,
    }
}

pub fn is_horizontal_space(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r')
}

/// Characters allowed anywhere in a mention: Unicode letters and digits,
/// `_`, `-` and `.`.
pub fn is_mention_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.')
}

/// Characters allowed to begin a mention. Dots and hyphens are excluded so a
/// mention is never empty once trailing dots are trimmed.
pub fn is_mention_start(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Trims the trailing dots a mention picks up from sentence punctuation
/// (`@alice.` names `alice`).
pub fn trim_mention(raw: &str) -> &str {
    raw.trim_end_matches('.')
}
