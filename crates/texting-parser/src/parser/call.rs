use super::machine::{BodyFence, Machine, MarkerMatch, Mode, line_len, strip_cr};
use crate::{
    backtick::{BacktickRun, RunKind, match_fence_close},
    classify::{is_horizontal_space, is_mention_char, is_mention_start},
    cursor::{Cursor, Scan},
    error::Result,
    grammar::Grammar,
};

impl Machine {
    /// Grows the raw first mention; the first non-mention character freezes
    /// it.
    pub(super) fn headline_mention(&mut self, rest: &str) -> Result<usize> {
        let taken = Cursor::new(rest).bump_while(is_mention_char);
        let Mode::CallHeadline { mention: Some(raw) } = &mut self.mode else {
            return Ok(0);
        };
        raw.push_str(taken);

        if taken.len() < rest.len() {
            let raw = std::mem::take(raw);
            self.freeze_mention(&raw)?;
        }
        Ok(taken.len())
    }

    /// Headline text after the mention. A line break ends the headline
    /// unless the next line is an indented or column-zero continuation that
    /// starts with another mention.
    pub(super) fn headline_text(&mut self, rest: &str, eof: bool) -> Scan<usize> {
        let brk = match line_break_len(rest, eof) {
            Scan::Ready(brk) => brk,
            Scan::NeedMore => return Scan::NeedMore,
        };
        if brk == 0 {
            // A lone `\r` is headline text; one before `\n` is decided above.
            let len = match rest.find(['\n', '\r']) {
                Some(0) => 1,
                Some(i) => i,
                None => rest.len(),
            };
            self.text(&rest[..len]);
            return Scan::Ready(len);
        }

        let after = &rest[brk..];
        let indent = after.len() - after.trim_start_matches([' ', '\t']).len();
        let next = &after[indent..];

        if indent == 0 {
            match self.match_marker(next, eof, true) {
                Scan::NeedMore => return Scan::NeedMore,
                Scan::Ready(MarkerMatch::None) => {}
                Scan::Ready(_) => return Scan::Ready(self.headline_break(brk)),
            }
        }

        let sigil = self.grammar.mention_sigil();
        let mut chars = next.chars();
        match chars.next() {
            None if !eof => Scan::NeedMore,
            Some(ch) if ch == sigil => match chars.next() {
                None if !eof => Scan::NeedMore,
                Some(ch) if is_mention_start(ch) => {
                    self.text(&rest[..brk + indent]);
                    Scan::Ready(brk + indent)
                }
                _ => Scan::Ready(self.headline_break(brk)),
            },
            _ => Scan::Ready(self.headline_break(brk)),
        }
    }

    fn headline_break(&mut self, brk: usize) -> usize {
        self.end_headline();
        self.at_line_start = true;
        brk
    }

    /// Between headline and body: blank lines are skipped, then a terminator
    /// or new call ends a bodyless call, a fence opens a fenced body and
    /// anything else starts a plain body.
    pub(super) fn before_body(&mut self, rest: &str, eof: bool) -> Scan<usize> {
        let ws = Cursor::new(rest).bump_while(|c| c == '\n' || is_horizontal_space(c));
        if !ws.is_empty() {
            if let Mode::CallBeforeBody { leading } = &mut self.mode {
                leading.push_str(ws);
            }
            self.at_line_start = ws.ends_with('\n');
            return Scan::Ready(ws.len());
        }

        if self.at_line_start {
            match self.match_marker(rest, eof, true) {
                Scan::NeedMore => return Scan::NeedMore,
                Scan::Ready(MarkerMatch::Terminator) => return Scan::Ready(self.terminate_call()),
                Scan::Ready(MarkerMatch::Call) => {
                    self.finish_call();
                    return Scan::Ready(0);
                }
                Scan::Ready(MarkerMatch::None) => {}
            }
        }

        if rest.starts_with(Grammar::TICK) {
            let run = match BacktickRun::scan_complete(rest, eof) {
                Scan::Ready(run) => run,
                Scan::NeedMore => return Scan::NeedMore,
            };
            if run.kind(&self.grammar) == RunKind::Fence {
                self.mode = Mode::CallBody {
                    fence: Some(BodyFence {
                        len: run.len,
                        opening: Some(rest[..run.len].to_string()),
                    }),
                };
                self.at_line_start = false;
                return Scan::Ready(run.len);
            }
        }

        let leading = match std::mem::replace(&mut self.mode, Mode::CallBody { fence: None }) {
            Mode::CallBeforeBody { leading } => leading,
            _ => String::new(),
        };
        self.start_body(None);
        if !leading.is_empty() {
            self.text(&leading);
        }
        Scan::Ready(0)
    }

    /// A plain body runs until a column-zero terminator or call marker.
    pub(super) fn plain_body(&mut self, rest: &str, eof: bool) -> Scan<usize> {
        if self.at_line_start {
            match self.match_marker(rest, eof, true) {
                Scan::NeedMore => return Scan::NeedMore,
                Scan::Ready(MarkerMatch::Terminator) => {
                    self.finish_body(None);
                    return Scan::Ready(self.terminate_call());
                }
                Scan::Ready(MarkerMatch::Call) => {
                    self.finish_body(None);
                    self.finish_call();
                    return Scan::Ready(0);
                }
                Scan::Ready(MarkerMatch::None) => {}
            }
        }

        let len = line_len(rest);
        self.text(&rest[..len]);
        self.at_line_start = rest[..len].ends_with('\n');
        Scan::Ready(len)
    }

    /// Reads the info string after a body's opening fence. The body starts
    /// once the opening line is complete.
    pub(super) fn fenced_body_opening(&mut self, rest: &str) -> usize {
        let len = rest.find('\n').unwrap_or(rest.len());
        let Mode::CallBody {
            fence: Some(BodyFence {
                opening: Some(line),
                ..
            }),
        } = &mut self.mode
        else {
            return 0;
        };
        line.push_str(&rest[..len]);
        if len == rest.len() {
            return len;
        }

        let mut line = std::mem::take(line);
        strip_cr(&mut line);
        if let Mode::CallBody { fence: Some(fence) } = &mut self.mode {
            fence.opening = None;
        }
        self.start_body(Some(line));
        self.at_line_start = true;
        len + 1
    }

    /// Fenced body content: everything is literal until a column-zero run of
    /// at least `fence_len` backticks alone on its line.
    pub(super) fn fenced_body(&mut self, rest: &str, fence_len: usize, eof: bool) -> Scan<usize> {
        if self.at_line_start && rest.starts_with(Grammar::TICK) {
            match match_fence_close(rest, fence_len, eof) {
                Scan::NeedMore => return Scan::NeedMore,
                Scan::Ready(Some(close)) => {
                    self.finish_body(Some(rest[..close.run_len].to_string()));
                    self.finish_call();
                    self.at_line_start = true;
                    return Scan::Ready(close.line_len);
                }
                Scan::Ready(None) => {}
            }
        }

        let len = line_len(rest);
        self.text(&rest[..len]);
        self.at_line_start = rest[..len].ends_with('\n');
        Scan::Ready(len)
    }
}

/// Length of the line break at the start of `rest`: 1 for `\n`, 2 for
/// `\r\n`, 0 when `rest` does not start with one.
fn line_break_len(rest: &str, eof: bool) -> Scan<usize> {
    if rest.starts_with('\n') {
        Scan::Ready(1)
    } else if rest.starts_with("\r\n") {
        Scan::Ready(2)
    } else if rest == "\r" && !eof {
        Scan::NeedMore
    } else {
        Scan::Ready(0)
    }
}
