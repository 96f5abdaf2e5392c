//! # Shared Bus - Channels Between Browsing Contexts
//!
//! A named, origin-scoped broadcast medium in the style of the browser's
//! `BroadcastChannel`: one channel per logical panel, every endpoint on a
//! channel sees every message except its own.
//!
//! ```text
//! ┌──────────────┐                         ┌──────────────┐
//! │   Primary    │   send(state-broadcast) │  Secondary   │
//! │   context    │ ──────┐          ┌───── │   context    │
//! └──────────────┘       │          │      └──────────────┘
//!                        ▼          ▼ send(state-request)
//!                  ┌──────────────────────┐
//!                  │ channel "prefix.id"  │
//!                  └──────────────────────┘
//! ```
//!
//! The [`Channel`] trait is the seam: [`InMemoryChannelHub`] delivers
//! in-process (tests, single-process hosts); a browser host implements the
//! same trait over its native primitive.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod channel;
pub mod hub;
pub mod subscriber;

pub use channel::{Channel, ChannelHub, ChannelName};
pub use hub::{InMemoryChannel, InMemoryChannelHub};
pub use subscriber::MessageStream;

/// Messages buffered per endpoint before the slowest one starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Default prefix for channel names.
pub const DEFAULT_CHANNEL_PREFIX: &str = "query-state";
