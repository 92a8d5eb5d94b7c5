//! # Streaming Parser
//!
//! [`TextingParser`] turns text arriving in arbitrary fragments into receiver
//! notifications. The state machine lives in [`machine`]; each mode's
//! scanning rules live in their own file:
//!
//! - `prose.rs`: free text, inline quoting, call markers and code fences at
//!   column zero
//! - `call.rs`: headline, the gap before a body, plain and fenced bodies
//! - `code_block.rs`: code block info string and content
//!
//! ## Chunk invariance
//!
//! A decision that depends on characters not yet fed is postponed: the
//! undecided text stays buffered and is re-scanned with the next fragment.
//! The coalesced notification stream and the collected calls are therefore
//! the same however the input is split.

mod call;
mod code_block;
mod machine;
mod prose;

use machine::Machine;

use crate::{
    call::CallRecord,
    error::{Result, TextingError},
    grammar::Grammar,
    receiver::TextingReceiver,
};

/// One streaming parse session.
pub struct TextingParser<R> {
    machine: Machine,
    receiver: R,
    finished: bool,
}

impl<R: TextingReceiver> TextingParser<R> {
    /// Creates a session with the default grammar.
    pub fn new(receiver: R) -> Self {
        Self {
            machine: Machine::new(Grammar::default()),
            receiver,
            finished: false,
        }
    }

    pub fn with_grammar(grammar: Grammar, receiver: R) -> Result<Self> {
        grammar.validate()?;
        Ok(Self {
            machine: Machine::new(grammar),
            receiver,
            finished: false,
        })
    }

    /// Consumes the next fragment. Payload text that is certain is delivered
    /// before this returns; text whose meaning depends on what follows is
    /// held back.
    pub async fn feed(&mut self, fragment: &str) -> Result<()> {
        if self.finished {
            return Err(TextingError::SessionFinished);
        }
        self.machine.push_input(fragment);
        self.drive(false).await?;
        self.machine.flush();
        self.deliver().await
    }

    /// Signals end of input: held-back text is resolved and whatever is open
    /// gets closed.
    pub async fn finalize(&mut self) -> Result<()> {
        if self.finished {
            return Err(TextingError::SessionFinished);
        }
        self.finished = true;
        self.drive(true).await?;
        self.machine.finish_at_eof()?;
        self.deliver().await
    }

    /// Calls completed so far, in order.
    pub fn collected_calls(&self) -> &[CallRecord] {
        self.machine.calls()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn receiver(&self) -> &R {
        &self.receiver
    }

    pub fn into_receiver(self) -> R {
        self.receiver
    }

    async fn drive(&mut self, eof: bool) -> Result<()> {
        loop {
            let progressed = self.machine.step(eof)?;
            self.deliver().await?;
            if !progressed {
                return Ok(());
            }
        }
    }

    /// Hands queued notifications to the receiver, awaiting each one.
    async fn deliver(&mut self) -> Result<()> {
        for event in self.machine.take_events() {
            event.deliver(&mut self.receiver).await?;
        }
        Ok(())
    }
}
