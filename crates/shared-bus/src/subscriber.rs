//! # Message Stream
//!
//! The receiving side of a channel endpoint.

use futures::stream::{BoxStream, Stream, StreamExt};
use shared_types::SyncEnvelope;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Stream of envelopes delivered to one endpoint.
///
/// Ends when the endpoint is closed or the underlying medium goes away.
pub struct MessageStream {
    inner: BoxStream<'static, SyncEnvelope>,
}

impl MessageStream {
    /// Wrap any envelope stream. Channel implementations build on this.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = SyncEnvelope> + Send + 'static,
    {
        Self {
            inner: stream.boxed(),
        }
    }

    /// Receive the next envelope.
    ///
    /// # Returns
    ///
    /// - `Some(envelope)` - The next message from another endpoint
    /// - `None` - The endpoint was closed
    pub async fn recv(&mut self) -> Option<SyncEnvelope> {
        self.inner.next().await
    }
}

impl Stream for MessageStream {
    type Item = SyncEnvelope;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}
