//! # Backtick Runs
//!
//! Backticks serve two purposes in texting:
//!
//! - a single backtick in prose toggles inline quoting, which hides call
//!   markers and fences until the matching backtick
//! - a column-zero run of [`Grammar::min_fence_len`] or more opens a fence,
//!   and a column-zero run at least as long as the opener closes it
//!
//! A run is only classified once it is complete. A run touching the end of
//! the buffered input may still grow, so every scan here reports
//! [`Scan::NeedMore`] instead of guessing.

use crate::{classify::is_horizontal_space, cursor::Scan, grammar::Grammar};

/// What a complete backtick run means outside a fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    None,
    /// One backtick: toggles inline quoting.
    Single,
    /// Shorter than a fence but more than one: literal text.
    Double,
    /// Long enough to open (or close) a fence.
    Fence,
}

/// A run of consecutive backticks at the start of some input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacktickRun {
    /// Number of backticks (and bytes) in the run.
    pub len: usize,
    /// Whether a non-backtick character follows, i.e. the run cannot grow.
    pub terminated: bool,
}

impl BacktickRun {
    pub fn scan(rest: &str) -> Self {
        let len = rest.bytes().take_while(|&b| b == b'`').count();
        Self {
            len,
            terminated: len < rest.len(),
        }
    }

    /// Scans a run, asking for more input if it reaches the end of `rest`
    /// and more may still arrive.
    pub fn scan_complete(rest: &str, eof: bool) -> Scan<Self> {
        let run = Self::scan(rest);
        if run.terminated || eof {
            Scan::Ready(run)
        } else {
            Scan::NeedMore
        }
    }

    pub fn kind(&self, grammar: &Grammar) -> RunKind {
        match self.len {
            0 => RunKind::None,
            1 => RunKind::Single,
            n if n >= grammar.min_fence_len => RunKind::Fence,
            _ => RunKind::Double,
        }
    }
}

/// Inline quoting state for prose.
///
/// Every single-backtick run flips the state, so an odd number of stray
/// backticks leaves the rest of the stream quoted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InlineQuote {
    open: bool,
}

impl InlineQuote {
    pub fn observe(&mut self, kind: RunKind) {
        if kind == RunKind::Single {
            self.open = !self.open;
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

/// A confirmed closing fence line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FenceClose {
    /// Length of the closing backtick run, reported verbatim.
    pub run_len: usize,
    /// Bytes of the whole closing line: run, trailing blanks, line break.
    pub line_len: usize,
}

/// Decides whether a column-zero line closes a fence opened with `required`
/// backticks: a run of at least `required`, optional horizontal whitespace,
/// then a line break or end of input.
pub fn match_fence_close(rest: &str, required: usize, eof: bool) -> Scan<Option<FenceClose>> {
    let run = match BacktickRun::scan_complete(rest, eof) {
        Scan::Ready(run) => run,
        Scan::NeedMore => return Scan::NeedMore,
    };
    if run.len < required {
        return Scan::Ready(None);
    }

    let mut line_len = run.len;
    for ch in rest[run.len..].chars() {
        match ch {
            '\n' => {
                return Scan::Ready(Some(FenceClose {
                    run_len: run.len,
                    line_len: line_len + 1,
                }));
            }
            c if is_horizontal_space(c) => line_len += c.len_utf8(),
            _ => return Scan::Ready(None),
        }
    }

    if eof {
        Scan::Ready(Some(FenceClose {
            run_len: run.len,
            line_len,
        }))
    } else {
        Scan::NeedMore
    }
}
