//! The caller's handle on a coordinated request.

use crate::error::CoordinatorError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

pub(crate) type Outcome<T> = Result<Arc<T>, CoordinatorError>;

/// How a [`Resolution`] was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionSource {
    /// Live cache entry; no fetch.
    CacheHit,
    /// Attached to a fetch already in flight.
    Joined,
    /// Started a new fetch.
    Fetched,
}

enum State<T> {
    Ready(Option<Arc<T>>),
    Pending(oneshot::Receiver<Outcome<T>>),
}

/// Future yielding the shared result for one fingerprint.
///
/// Every caller attached to the same in-flight request receives the same
/// `Arc`. Dropping a resolution detaches the caller without affecting the
/// fetch.
#[must_use = "a resolution does nothing unless awaited"]
pub struct Resolution<T> {
    source: ResolutionSource,
    state: State<T>,
}

impl<T> Resolution<T> {
    pub(crate) fn ready(value: Arc<T>) -> Self {
        Self {
            source: ResolutionSource::CacheHit,
            state: State::Ready(Some(value)),
        }
    }

    pub(crate) fn pending(receiver: oneshot::Receiver<Outcome<T>>, source: ResolutionSource) -> Self {
        Self {
            source,
            state: State::Pending(receiver),
        }
    }

    #[must_use]
    pub fn source(&self) -> ResolutionSource {
        self.source
    }

    #[must_use]
    pub fn is_cache_hit(&self) -> bool {
        self.source == ResolutionSource::CacheHit
    }

    /// The value, when it is available without waiting.
    #[must_use]
    pub fn cached(&self) -> Option<Arc<T>> {
        match &self.state {
            State::Ready(value) => value.clone(),
            State::Pending(_) => None,
        }
    }
}

// No field is ever pinned structurally.
impl<T> Unpin for Resolution<T> {}

impl<T> Future for Resolution<T> {
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.state {
            State::Ready(value) => Poll::Ready(value.take().ok_or(CoordinatorError::Abandoned)),
            State::Pending(receiver) => match Pin::new(receiver).poll(cx) {
                Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
                Poll::Ready(Err(_)) => Poll::Ready(Err(CoordinatorError::Abandoned)),
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

impl<T> fmt::Debug for Resolution<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ready = matches!(self.state, State::Ready(_));
        f.debug_struct("Resolution")
            .field("source", &self.source)
            .field("ready", &ready)
            .finish()
    }
}
