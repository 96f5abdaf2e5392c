//! Driven ports required by the Address State Store.

use shared_types::StateDelta;

/// The environment's addressable location (the address bar).
///
/// Only the query component is exchanged; path and fragment belong to the
/// host.
pub trait AddressLocation: Send + Sync {
    /// Current query string, with or without a leading `?`.
    fn read(&self) -> String;

    /// Replace the query string as a new history entry.
    fn push(&self, query: &str);
}

/// Sink for writes issued inside a secondary context.
///
/// Installed by the cross-context synchronizer so that every secondary
/// write becomes a state-request to the primary. Implementations must not
/// fail into the caller: delivery problems are logged and swallowed.
pub trait WriteRedirect: Send + Sync {
    fn forward(&self, delta: StateDelta);
}
