//! # texting-parser
//!
//! Streaming parser for texting markup: prose interleaved with `@mention`
//! calls and fenced code blocks, as produced token by token by a chat model.
//!
//! ```text
//! Some prose.
//! !!@tool1 summarize this
//! body line one
//! body line two
//! !!@/
//! ```
//!
//! Text is fed in arbitrary fragments through [`TextingParser::feed`] and
//! reported to a [`TextingReceiver`] as it becomes certain. Completed calls
//! are also collected as [`CallRecord`]s with a stable short id.
//!
//! [`extract_mentions`] finds mentions in an already complete text.

pub mod backtick;
pub mod call;
pub mod classify;
pub mod cursor;
pub mod error;
pub mod event;
pub mod grammar;
pub mod mentions;
pub mod parser;
pub mod receiver;

#[cfg(test)]
mod tests;

pub use call::{CALL_ID_LEN, CallRecord};
pub use error::{Result, TextingError};
pub use event::{Event, EventRecorder, EventSink, coalesce_chunks};
pub use grammar::Grammar;
pub use mentions::extract_mentions;
pub use parser::TextingParser;
pub use receiver::TextingReceiver;
