use super::machine::{Machine, MarkerMatch, Mode};
use crate::{
    backtick::{BacktickRun, RunKind},
    classify::{CharClass, classify, is_horizontal_space},
    cursor::Scan,
    grammar::Grammar,
};

impl Machine {
    /// One decision in free text. Returns the number of bytes consumed.
    pub(super) fn free_text(&mut self, rest: &str, eof: bool) -> Scan<usize> {
        let Some(ch) = rest.chars().next() else {
            return Scan::Ready(0);
        };

        if self.skip_terminator_tail {
            match terminator_tail(rest, eof) {
                Scan::NeedMore => return Scan::NeedMore,
                Scan::Ready(Some(len)) => {
                    self.skip_terminator_tail = false;
                    self.at_line_start = rest[..len].ends_with('\n');
                    return Scan::Ready(len);
                }
                // Text follows on the terminator line; the blanks are prose.
                Scan::Ready(None) => self.skip_terminator_tail = false,
            }
        }

        match classify(ch, &self.grammar) {
            CharClass::Backtick => self.prose_backticks(rest, eof),
            CharClass::Marker if self.at_line_start && !self.inline.is_open() => {
                match self.match_marker(rest, eof, false) {
                    Scan::NeedMore => Scan::NeedMore,
                    Scan::Ready(MarkerMatch::Call) => {
                        self.begin_call();
                        self.at_line_start = false;
                        Scan::Ready(self.grammar.call_marker.len())
                    }
                    Scan::Ready(_) => Scan::Ready(self.prose_stretch(rest)),
                }
            }
            CharClass::LineBreak => {
                self.markdown("\n");
                self.at_line_start = true;
                Scan::Ready(1)
            }
            _ => Scan::Ready(self.prose_stretch(rest)),
        }
    }

    fn prose_backticks(&mut self, rest: &str, eof: bool) -> Scan<usize> {
        let run = match BacktickRun::scan_complete(rest, eof) {
            Scan::Ready(run) => run,
            Scan::NeedMore => return Scan::NeedMore,
        };
        let kind = run.kind(&self.grammar);

        if self.at_line_start && !self.inline.is_open() && kind == RunKind::Fence {
            self.close_markdown();
            self.mode = Mode::CodeBlockInfo {
                fence: rest[..run.len].to_string(),
                info: String::new(),
            };
        } else {
            self.inline.observe(kind);
            self.markdown(&rest[..run.len]);
        }
        self.at_line_start = false;
        Scan::Ready(run.len)
    }

    /// Literal prose up to the next backtick or line break. Always consumes
    /// at least the first character.
    fn prose_stretch(&mut self, rest: &str) -> usize {
        let first = rest.chars().next().map_or(0, char::len_utf8);
        let len = rest[first..]
            .find(['\n', Grammar::TICK])
            .map_or(rest.len(), |i| first + i);
        self.markdown(&rest[..len]);
        self.at_line_start = false;
        len
    }
}

/// The rest of a terminator line belongs to the delimiter only when it is
/// blank: trailing blanks plus the line break (or end of input). Returns the
/// bytes to swallow, or `None` when other text follows.
fn terminator_tail(rest: &str, eof: bool) -> Scan<Option<usize>> {
    let blanks = rest.len() - rest.trim_start_matches(is_horizontal_space).len();
    match rest[blanks..].chars().next() {
        Some('\n') => Scan::Ready(Some(blanks + 1)),
        Some(_) => Scan::Ready(None),
        None if eof => Scan::Ready(Some(blanks)),
        None => Scan::NeedMore,
    }
}
