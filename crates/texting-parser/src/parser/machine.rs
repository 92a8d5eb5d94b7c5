use crate::{
    backtick::InlineQuote,
    call::{CallAccumulator, CallRecord},
    classify::{is_mention_start, trim_mention},
    cursor::Scan,
    error::Result,
    event::Event,
    grammar::Grammar,
};

/// Length of `rest` up to and including the first line break.
pub(super) fn line_len(rest: &str) -> usize {
    rest.find('\n').map_or(rest.len(), |i| i + 1)
}

/// Drops the `\r` of a CRLF line break from a completed opening line.
pub(super) fn strip_cr(line: &mut String) {
    if line.ends_with('\r') {
        line.pop();
    }
}

/// Where the state machine currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Mode {
    /// Prose between structures.
    FreeText,
    /// Inside a call's headline. `mention` holds the raw mention while it is
    /// still growing; `None` once it is frozen and `call_start` has fired.
    CallHeadline { mention: Option<String> },
    /// After the headline, skipping whitespace to see what follows.
    CallBeforeBody { leading: String },
    /// Inside a call body, plain (`fence: None`) or fenced.
    CallBody { fence: Option<BodyFence> },
    /// Reading the info string after a code block's opening fence.
    CodeBlockInfo { fence: String, info: String },
    /// Inside a code block opened with `fence_len` backticks.
    CodeBlockContent { fence_len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct BodyFence {
    pub(super) len: usize,
    /// The opening line while it is still being read.
    pub(super) opening: Option<String>,
}

/// The payload family currently receiving chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Segment {
    Markdown,
    Headline,
    Body,
    CodeBlock,
}

/// Result of matching a call marker or terminator at column zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum MarkerMatch {
    Call,
    Terminator,
    None,
}

/// The synchronous core of the parser.
///
/// Input is appended to `input`; each [`step`](Machine::step) makes one
/// decision at `pos` and queues the resulting events. A step that cannot
/// decide without seeing past the end of `input` consumes nothing, so the
/// undecided text waits for the next fragment. Decisions therefore depend
/// only on the text, never on where it was split.
pub(super) struct Machine {
    pub(super) grammar: Grammar,
    pub(super) mode: Mode,
    input: String,
    pos: usize,
    pub(super) at_line_start: bool,
    pub(super) inline: InlineQuote,
    /// Set after a terminator: blanks and one line break are swallowed.
    pub(super) skip_terminator_tail: bool,
    segment: Option<Segment>,
    chunk: String,
    call: CallAccumulator,
    call_counter: u64,
    calls: Vec<CallRecord>,
    events: Vec<Event>,
}

impl Machine {
    pub(super) fn new(grammar: Grammar) -> Self {
        Self {
            grammar,
            mode: Mode::FreeText,
            input: String::new(),
            pos: 0,
            at_line_start: true,
            inline: InlineQuote::default(),
            skip_terminator_tail: false,
            segment: None,
            chunk: String::new(),
            call: CallAccumulator::new(),
            call_counter: 0,
            calls: vec![],
            events: vec![],
        }
    }

    pub(super) fn push_input(&mut self, fragment: &str) {
        if self.pos > 0 {
            self.input.drain(..self.pos);
            self.pos = 0;
        }
        self.input.push_str(fragment);
    }

    /// Makes one decision. Returns `false` when nothing more can be decided
    /// with the input at hand.
    pub(super) fn step(&mut self, eof: bool) -> Result<bool> {
        if self.pos >= self.input.len() {
            return Ok(false);
        }

        let input = std::mem::take(&mut self.input);
        let decided = self.step_at(&input[self.pos..], eof);
        self.input = input;

        match decided? {
            Scan::Ready(consumed) => {
                self.pos += consumed;
                Ok(true)
            }
            Scan::NeedMore => {
                log::trace!(
                    "holding back {} bytes until the next fragment",
                    self.input.len() - self.pos
                );
                Ok(false)
            }
        }
    }

    fn step_at(&mut self, rest: &str, eof: bool) -> Result<Scan<usize>> {
        let decided = match &self.mode {
            Mode::FreeText => self.free_text(rest, eof),
            Mode::CallHeadline { mention: Some(_) } => Scan::Ready(self.headline_mention(rest)?),
            Mode::CallHeadline { mention: None } => self.headline_text(rest, eof),
            Mode::CallBeforeBody { .. } => self.before_body(rest, eof),
            Mode::CallBody { fence: None } => self.plain_body(rest, eof),
            Mode::CallBody {
                fence: Some(BodyFence {
                    opening: Some(_), ..
                }),
            } => Scan::Ready(self.fenced_body_opening(rest)),
            Mode::CallBody {
                fence: Some(BodyFence { len, opening: None }),
            } => {
                let len = *len;
                self.fenced_body(rest, len, eof)
            }
            Mode::CodeBlockInfo { .. } => Scan::Ready(self.code_block_info(rest)),
            Mode::CodeBlockContent { fence_len } => {
                let fence_len = *fence_len;
                self.code_block_content(rest, fence_len, eof)
            }
        };
        Ok(decided)
    }

    /// Closes whatever is open as if the input ended here.
    pub(super) fn finish_at_eof(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.mode, Mode::FreeText) {
            Mode::FreeText => self.close_markdown(),
            Mode::CallHeadline { mention: Some(raw) } => {
                self.freeze_mention(&raw)?;
                self.end_headline();
                self.finish_call();
            }
            Mode::CallHeadline { mention: None } => {
                self.end_headline();
                self.finish_call();
            }
            Mode::CallBeforeBody { .. } => self.finish_call(),
            Mode::CallBody { fence: None } => {
                self.finish_body(None);
                self.finish_call();
            }
            Mode::CallBody { fence: Some(fence) } => {
                if let Some(opening) = fence.opening {
                    self.start_body(Some(opening));
                }
                self.finish_body(Some(String::new()));
                self.finish_call();
            }
            Mode::CodeBlockInfo { fence, info } => {
                self.start_code_block(fence, info);
                self.finish_code_block(String::new());
            }
            Mode::CodeBlockContent { .. } => self.finish_code_block(String::new()),
        }
        Ok(())
    }

    pub(super) fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub(super) fn calls(&self) -> &[CallRecord] {
        &self.calls
    }

    // Column-zero markers

    /// Matches the call marker (and optionally the terminator) at the start
    /// of `rest`. A call marker only counts when a mention start character
    /// follows it.
    pub(super) fn match_marker(
        &self,
        rest: &str,
        eof: bool,
        with_terminator: bool,
    ) -> Scan<MarkerMatch> {
        let marker = self.grammar.call_marker.as_str();
        let terminator = self.grammar.terminator.as_str();

        if with_terminator {
            if rest.starts_with(terminator) {
                return Scan::Ready(MarkerMatch::Terminator);
            }
            if !eof && terminator.starts_with(rest) {
                return Scan::NeedMore;
            }
        }

        if let Some(after) = rest.strip_prefix(marker) {
            return match after.chars().next() {
                Some(ch) if is_mention_start(ch) => Scan::Ready(MarkerMatch::Call),
                Some(_) => Scan::Ready(MarkerMatch::None),
                None if eof => Scan::Ready(MarkerMatch::None),
                None => Scan::NeedMore,
            };
        }
        if !eof && marker.starts_with(rest) {
            return Scan::NeedMore;
        }
        Scan::Ready(MarkerMatch::None)
    }

    // Payload emission

    /// Appends text to the open segment.
    pub(super) fn text(&mut self, text: &str) {
        match self.segment {
            Some(Segment::Headline) => self.call.push_head_line(text),
            Some(Segment::Body) => self.call.push_body(text),
            Some(Segment::Markdown | Segment::CodeBlock) => {}
            None => debug_assert!(false, "text outside any segment: {text:?}"),
        }
        self.chunk.push_str(text);
    }

    /// Emits buffered text of the open segment as one chunk event.
    pub(super) fn flush(&mut self) {
        if self.chunk.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.chunk);
        let event = match self.segment {
            Some(Segment::Markdown) => Event::MarkdownChunk { text },
            Some(Segment::Headline) => Event::CallHeadlineChunk { text },
            Some(Segment::Body) => Event::CallBodyChunk { text },
            Some(Segment::CodeBlock) => Event::CodeBlockChunk { text },
            None => return,
        };
        self.events.push(event);
    }

    fn open(&mut self, segment: Segment, event: Event) {
        self.flush();
        self.events.push(event);
        self.segment = Some(segment);
    }

    fn close(&mut self, event: Event) {
        self.flush();
        self.events.push(event);
        self.segment = None;
    }

    pub(super) fn markdown(&mut self, text: &str) {
        if self.segment != Some(Segment::Markdown) {
            self.open(Segment::Markdown, Event::MarkdownStart);
        }
        self.text(text);
    }

    pub(super) fn close_markdown(&mut self) {
        if self.segment == Some(Segment::Markdown) {
            self.close(Event::MarkdownFinish);
        }
    }

    // Call lifecycle

    pub(super) fn begin_call(&mut self) {
        self.call = CallAccumulator::new();
        self.mode = Mode::CallHeadline {
            mention: Some(String::new()),
        };
    }

    /// Freezes the first mention: prose before the call is closed and the
    /// call becomes visible to the receiver.
    pub(super) fn freeze_mention(&mut self, raw: &str) -> Result<()> {
        let mention = trim_mention(raw);
        self.call.set_first_mention(mention)?;
        self.close_markdown();
        log::debug!("call started: {mention}");
        self.open(
            Segment::Headline,
            Event::CallStart {
                first_mention: mention.to_string(),
            },
        );
        self.text(raw);
        self.mode = Mode::CallHeadline { mention: None };
        Ok(())
    }

    pub(super) fn end_headline(&mut self) {
        self.close(Event::CallHeadlineFinish);
        self.mode = Mode::CallBeforeBody {
            leading: String::new(),
        };
    }

    pub(super) fn start_body(&mut self, fence: Option<String>) {
        self.call.start_body(fence.as_deref());
        self.open(Segment::Body, Event::CallBodyStart { fence });
    }

    pub(super) fn finish_body(&mut self, closing_fence: Option<String>) {
        self.close(Event::CallBodyFinish { closing_fence });
    }

    /// Completes the open call and returns to prose.
    pub(super) fn finish_call(&mut self) {
        let record = self.call.finish(self.call_counter);
        self.call_counter += 1;
        log::debug!(
            "call finished: {} ({})",
            record.first_mention,
            record.call_id
        );
        self.close(Event::CallFinish {
            call_id: record.call_id.clone(),
        });
        self.calls.push(record);
        self.mode = Mode::FreeText;
    }

    /// Consumes a terminator: the call closes and the rest of the terminator
    /// line is swallowed.
    pub(super) fn terminate_call(&mut self) -> usize {
        self.finish_call();
        self.skip_terminator_tail = true;
        self.at_line_start = false;
        self.grammar.terminator.len()
    }

    // Code blocks

    pub(super) fn start_code_block(&mut self, fence: String, info: String) {
        log::debug!("code block opened: {fence}{info}");
        self.open(Segment::CodeBlock, Event::CodeBlockStart { fence, info });
    }

    pub(super) fn finish_code_block(&mut self, closing_fence: String) {
        log::debug!("code block closed");
        self.close(Event::CodeBlockFinish { closing_fence });
        self.mode = Mode::FreeText;
    }
}
