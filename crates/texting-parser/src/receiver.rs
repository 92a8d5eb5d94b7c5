//! # Event Receiver Contract
//!
//! The parser reports what it recognizes through a [`TextingReceiver`]. Three
//! families of notifications exist and exactly one family is open at a time:
//!
//! ```text
//! markdown:   markdown_start → markdown_chunk* → markdown_finish
//! call:       call_start(mention) → call_headline_chunk* → call_headline_finish
//!             → [call_body_start(fence?) → call_body_chunk* → call_body_finish(fence?)]?
//!             → call_finish(call_id)
//! code block: code_block_start(fence, info) → code_block_chunk* → code_block_finish(fence)
//! ```
//!
//! Chunk boundaries carry no meaning: consumers must concatenate chunks.
//!
//! Every notification is awaited before the parser scans further, so a
//! receiver may persist or dispatch work inline. A failing notification
//! aborts the current `feed` with [`TextingError::Receiver`].
//!
//! [`TextingError::Receiver`]: crate::TextingError::Receiver

/// Downstream consumer of parser notifications.
#[allow(async_fn_in_trait)]
pub trait TextingReceiver {
    async fn markdown_start(&mut self) -> anyhow::Result<()>;
    async fn markdown_chunk(&mut self, text: &str) -> anyhow::Result<()>;
    async fn markdown_finish(&mut self) -> anyhow::Result<()>;

    /// A call opened. `first_mention` is frozen for the rest of the call.
    async fn call_start(&mut self, first_mention: &str) -> anyhow::Result<()>;
    async fn call_headline_chunk(&mut self, text: &str) -> anyhow::Result<()>;
    async fn call_headline_finish(&mut self) -> anyhow::Result<()>;
    /// `fence` is the literal opening line of a fenced body, `None` for a
    /// plain body.
    async fn call_body_start(&mut self, fence: Option<&str>) -> anyhow::Result<()>;
    async fn call_body_chunk(&mut self, text: &str) -> anyhow::Result<()>;
    /// `closing_fence` is the literal closing run of a fenced body (empty when
    /// the input ended first), `None` for a plain body.
    async fn call_body_finish(&mut self, closing_fence: Option<&str>) -> anyhow::Result<()>;
    async fn call_finish(&mut self, call_id: &str) -> anyhow::Result<()>;

    async fn code_block_start(&mut self, fence: &str, info: &str) -> anyhow::Result<()>;
    async fn code_block_chunk(&mut self, text: &str) -> anyhow::Result<()>;
    /// `closing_fence` is empty when the input ended inside the block.
    async fn code_block_finish(&mut self, closing_fence: &str) -> anyhow::Result<()>;
}
