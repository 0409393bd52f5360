//! Client-side view state for the MEmento portal.
//!
//! Each view owns the records it renders and is the only thing that
//! mutates them. User actions go through the pure transitions in
//! `memento-core` first, then out to the server; failures roll back to the
//! snapshot and leave a dismissible error on the view.

pub mod backend;
pub mod chat;
pub mod directory;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod inbox;
pub mod session;

#[cfg(test)]
mod testing;

pub use backend::{HttpBackend, PortalBackend};
pub use error::ClientError;
pub use session::Session;

/// How an optimistic write ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The server accepted it; the view now shows the server's state.
    Confirmed,
    /// The write failed and the view is back on its snapshot.
    Reverted,
    /// The view was unmounted first; the result was dropped.
    Discarded,
    /// Nothing in the view matched the id.
    Missing,
}
