//! # Mention Extraction
//!
//! Finds every `@mention` in a complete piece of text, for indexing
//! references inside stored messages. Unlike the streaming parser this works
//! on the whole string at once, but it uses the same character rules:
//!
//! - a mention is the sigil followed by a mention start character, then any
//!   run of mention characters, with trailing dots trimmed
//! - the sigil only counts at the start of the text or after a character
//!   that cannot be part of a mention, so `user@example.com` is not a mention
//! - text inside single-backtick or fence-quoted spans is skipped

use crate::{
    backtick::{BacktickRun, InlineQuote, RunKind},
    classify::{is_mention_char, is_mention_start, trim_mention},
    cursor::Cursor,
    grammar::Grammar,
};

/// Returns the mentions in `text` in order of appearance, duplicates kept.
pub fn extract_mentions(text: &str, grammar: &Grammar) -> Vec<String> {
    let sigil = grammar.mention_sigil();
    let mut cur = Cursor::new(text);
    let mut out = vec![];
    let mut inline = InlineQuote::default();
    // Length of the open fence-quoted span, if any.
    let mut fence: Option<usize> = None;
    let mut prev: Option<char> = None;

    while let Some(ch) = cur.peek() {
        if ch == Grammar::TICK {
            let run = BacktickRun::scan(cur.rest());
            cur.bump_n(run.len);
            prev = Some(Grammar::TICK);
            match fence {
                Some(open) if run.len >= open => fence = None,
                Some(_) => {}
                None if inline.is_open() => inline.observe(run.kind(grammar)),
                None => match run.kind(grammar) {
                    RunKind::Fence => fence = Some(run.len),
                    kind => inline.observe(kind),
                },
            }
            continue;
        }

        let quoted = fence.is_some() || inline.is_open();
        let standalone = prev.is_none_or(|p| !is_mention_char(p));
        cur.bump();
        prev = Some(ch);

        if quoted || ch != sigil || !standalone {
            continue;
        }
        if !cur.peek().is_some_and(is_mention_start) {
            continue;
        }
        let raw = cur.bump_while(is_mention_char);
        prev = raw.chars().last();
        out.push(trim_mention(raw).to_string());
    }

    out
}
