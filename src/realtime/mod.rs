//! Realtime fan-out of committed board events.
//!
//! Clients join the channel of the project whose board they are viewing and
//! receive every committed [`BoardEvent`] for that project in the order the
//! service published them. Subscribers that cannot keep up or have gone
//! away are dropped from the channel; the publishing operation never fails
//! because of them.

mod channels;

pub use channels::{BroadcastFailure, ProjectChannels, SubscriberId, Subscription};
pub use crate::task::domain::{BoardEvent, TaskDeleted, TaskMoved, TaskView};
