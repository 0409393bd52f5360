//! MEmento core logic.
//!
//! Everything in here is pure and synchronous: the reaction engines, the
//! directory sort projection, value normalisation for display, and the
//! two-phase optimistic update used by the client views. Remote I/O lives
//! in memento-api (server side) and memento-client (view side).

pub mod directory;
pub mod feed;
pub mod format;
pub mod optimistic;
pub mod reactions;
