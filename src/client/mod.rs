//! Optimistic client cache.
//!
//! [`BoardCache`] mirrors one project's board on the client and applies
//! drags immediately; [`OptimisticMover`] sends the move through a
//! [`MoveTransport`] and settles the pending move with the server's answer.
//! Broadcast events are merged with [`BoardCache::apply_event`].

mod cache;
mod mover;
mod transport;

pub use cache::{BoardCache, CacheError, PendingMoveId, PendingMoveState};
pub use mover::{MoveError, MoveTransport, OptimisticMover, TransportError};
pub use transport::ServiceTransport;
