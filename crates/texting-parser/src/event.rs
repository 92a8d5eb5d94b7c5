use std::fmt;

use serde::Serialize;

use crate::receiver::TextingReceiver;

/// An owned receiver notification.
///
/// The parser queues these internally and delivers them one at a time; the
/// same type doubles as a serializable trace for tools and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    MarkdownStart,
    MarkdownChunk { text: String },
    MarkdownFinish,
    CallStart { first_mention: String },
    CallHeadlineChunk { text: String },
    CallHeadlineFinish,
    CallBodyStart { fence: Option<String> },
    CallBodyChunk { text: String },
    CallBodyFinish { closing_fence: Option<String> },
    CallFinish { call_id: String },
    CodeBlockStart { fence: String, info: String },
    CodeBlockChunk { text: String },
    CodeBlockFinish { closing_fence: String },
}

impl Event {
    /// Hands this event to the matching receiver method.
    pub async fn deliver<R: TextingReceiver>(&self, receiver: &mut R) -> anyhow::Result<()> {
        match self {
            Event::MarkdownStart => receiver.markdown_start().await,
            Event::MarkdownChunk { text } => receiver.markdown_chunk(text).await,
            Event::MarkdownFinish => receiver.markdown_finish().await,
            Event::CallStart { first_mention } => receiver.call_start(first_mention).await,
            Event::CallHeadlineChunk { text } => receiver.call_headline_chunk(text).await,
            Event::CallHeadlineFinish => receiver.call_headline_finish().await,
            Event::CallBodyStart { fence } => receiver.call_body_start(fence.as_deref()).await,
            Event::CallBodyChunk { text } => receiver.call_body_chunk(text).await,
            Event::CallBodyFinish { closing_fence } => {
                receiver.call_body_finish(closing_fence.as_deref()).await
            }
            Event::CallFinish { call_id } => receiver.call_finish(call_id).await,
            Event::CodeBlockStart { fence, info } => receiver.code_block_start(fence, info).await,
            Event::CodeBlockChunk { text } => receiver.code_block_chunk(text).await,
            Event::CodeBlockFinish { closing_fence } => {
                receiver.code_block_finish(closing_fence).await
            }
        }
    }

    /// The payload of a chunk event.
    pub fn chunk_text(&self) -> Option<&str> {
        match self {
            Event::MarkdownChunk { text }
            | Event::CallHeadlineChunk { text }
            | Event::CallBodyChunk { text }
            | Event::CodeBlockChunk { text } => Some(text),
            _ => None,
        }
    }

    fn append_chunk(&mut self, more: &str) {
        match self {
            Event::MarkdownChunk { text }
            | Event::CallHeadlineChunk { text }
            | Event::CallBodyChunk { text }
            | Event::CodeBlockChunk { text } => text.push_str(more),
            _ => {}
        }
    }
}

/// One line per event; payload text is shown escaped.
impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::MarkdownStart => write!(f, "markdown start"),
            Event::MarkdownChunk { text } => write!(f, "markdown {text:?}"),
            Event::MarkdownFinish => write!(f, "markdown finish"),
            Event::CallStart { first_mention } => write!(f, "call start {first_mention}"),
            Event::CallHeadlineChunk { text } => write!(f, "  headline {text:?}"),
            Event::CallHeadlineFinish => write!(f, "  headline finish"),
            Event::CallBodyStart { fence: None } => write!(f, "  body start"),
            Event::CallBodyStart { fence: Some(fence) } => write!(f, "  body start {fence:?}"),
            Event::CallBodyChunk { text } => write!(f, "  body {text:?}"),
            Event::CallBodyFinish {
                closing_fence: None,
            } => write!(f, "  body finish"),
            Event::CallBodyFinish {
                closing_fence: Some(fence),
            } => write!(f, "  body finish {fence:?}"),
            Event::CallFinish { call_id } => write!(f, "call finish {call_id}"),
            Event::CodeBlockStart { fence, info } => write!(f, "code block start {fence:?} {info:?}"),
            Event::CodeBlockChunk { text } => write!(f, "code block {text:?}"),
            Event::CodeBlockFinish { closing_fence } => {
                write!(f, "code block finish {closing_fence:?}")
            }
        }
    }
}

/// Merges adjacent chunk events of the same kind.
///
/// Two feeds of the same text split differently produce the same coalesced
/// trace; only the chunk granularity differs before coalescing.
pub fn coalesce_chunks(events: impl IntoIterator<Item = Event>) -> Vec<Event> {
    let mut out: Vec<Event> = vec![];
    for event in events {
        if let (Some(last), Some(text)) = (out.last_mut(), event.chunk_text())
            && std::mem::discriminant(last) == std::mem::discriminant(&event)
        {
            last.append_chunk(text);
            continue;
        }
        out.push(event);
    }
    out
}

/// A consumer that takes notifications as owned [`Event`]s.
///
/// Every `EventSink` is a [`TextingReceiver`], so a sink only has to handle
/// one method instead of one per notification.
#[allow(async_fn_in_trait)]
pub trait EventSink {
    async fn event(&mut self, event: Event) -> anyhow::Result<()>;
}

impl<S: EventSink> TextingReceiver for S {
    async fn markdown_start(&mut self) -> anyhow::Result<()> {
        self.event(Event::MarkdownStart).await
    }

    async fn markdown_chunk(&mut self, text: &str) -> anyhow::Result<()> {
        self.event(Event::MarkdownChunk {
            text: text.to_string(),
        })
        .await
    }

    async fn markdown_finish(&mut self) -> anyhow::Result<()> {
        self.event(Event::MarkdownFinish).await
    }

    async fn call_start(&mut self, first_mention: &str) -> anyhow::Result<()> {
        self.event(Event::CallStart {
            first_mention: first_mention.to_string(),
        })
        .await
    }

    async fn call_headline_chunk(&mut self, text: &str) -> anyhow::Result<()> {
        self.event(Event::CallHeadlineChunk {
            text: text.to_string(),
        })
        .await
    }

    async fn call_headline_finish(&mut self) -> anyhow::Result<()> {
        self.event(Event::CallHeadlineFinish).await
    }

    async fn call_body_start(&mut self, fence: Option<&str>) -> anyhow::Result<()> {
        self.event(Event::CallBodyStart {
            fence: fence.map(str::to_string),
        })
        .await
    }

    async fn call_body_chunk(&mut self, text: &str) -> anyhow::Result<()> {
        self.event(Event::CallBodyChunk {
            text: text.to_string(),
        })
        .await
    }

    async fn call_body_finish(&mut self, closing_fence: Option<&str>) -> anyhow::Result<()> {
        self.event(Event::CallBodyFinish {
            closing_fence: closing_fence.map(str::to_string),
        })
        .await
    }

    async fn call_finish(&mut self, call_id: &str) -> anyhow::Result<()> {
        self.event(Event::CallFinish {
            call_id: call_id.to_string(),
        })
        .await
    }

    async fn code_block_start(&mut self, fence: &str, info: &str) -> anyhow::Result<()> {
        self.event(Event::CodeBlockStart {
            fence: fence.to_string(),
            info: info.to_string(),
        })
        .await
    }

    async fn code_block_chunk(&mut self, text: &str) -> anyhow::Result<()> {
        self.event(Event::CodeBlockChunk {
            text: text.to_string(),
        })
        .await
    }

    async fn code_block_finish(&mut self, closing_fence: &str) -> anyhow::Result<()> {
        self.event(Event::CodeBlockFinish {
            closing_fence: closing_fence.to_string(),
        })
        .await
    }
}

/// A receiver that records every notification in order.
#[derive(Debug, Default)]
pub struct EventRecorder {
    pub events: Vec<Event>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

impl EventSink for EventRecorder {
    async fn event(&mut self, event: Event) -> anyhow::Result<()> {
        self.events.push(event);
        Ok(())
    }
}
