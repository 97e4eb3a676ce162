//! Registry of per-project subscriber channels.

use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::task::{
    domain::{BoardEvent, ProjectId},
    ports::{BoardEventPublisher, PublishReport},
};

/// Identifier of one subscriber inside the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Returns the raw counter value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscriber-{}", self.0)
    }
}

/// Delivery to one subscriber failed; the subscriber is removed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastFailure {
    /// The subscriber's buffer is full.
    #[error("{subscriber} on project {project_id} is lagging behind")]
    Lagging {
        /// Project channel.
        project_id: ProjectId,
        /// Dropped subscriber.
        subscriber: SubscriberId,
    },
    /// The subscriber's receiving end is gone.
    #[error("{subscriber} on project {project_id} has disconnected")]
    Disconnected {
        /// Project channel.
        project_id: ProjectId,
        /// Dropped subscriber.
        subscriber: SubscriberId,
    },
}

impl BroadcastFailure {
    fn from_send_error<T>(
        project_id: ProjectId,
        subscriber: SubscriberId,
        err: &TrySendError<T>,
    ) -> Self {
        match err {
            TrySendError::Full(_) => Self::Lagging {
                project_id,
                subscriber,
            },
            TrySendError::Closed(_) => Self::Disconnected {
                project_id,
                subscriber,
            },
        }
    }
}

type Members = HashMap<SubscriberId, mpsc::Sender<Arc<BoardEvent>>>;

#[derive(Debug)]
struct Registry {
    channels: DashMap<ProjectId, Members>,
    next_id: AtomicU64,
    capacity: usize,
}

impl Registry {
    fn remove(&self, project_id: ProjectId, subscriber: SubscriberId) -> bool {
        let removed = self
            .channels
            .get_mut(&project_id)
            .is_some_and(|mut members| members.remove(&subscriber).is_some());
        self.channels
            .remove_if(&project_id, |_, members| members.is_empty());
        removed
    }
}

/// Explicit registry of who watches which project.
///
/// Cloning yields another handle to the same registry.
#[derive(Debug, Clone)]
pub struct ProjectChannels {
    registry: Arc<Registry>,
}

impl Default for ProjectChannels {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl ProjectChannels {
    /// Per-subscriber buffer used by [`Default`].
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Creates an empty registry whose subscribers buffer up to `capacity`
    /// events each (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Registry {
                channels: DashMap::new(),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Subscribes to `project_id`. Dropping the subscription leaves the
    /// channel.
    #[must_use]
    pub fn join(&self, project_id: ProjectId) -> Subscription {
        let id = SubscriberId(self.registry.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(self.registry.capacity);
        self.registry
            .channels
            .entry(project_id)
            .or_default()
            .insert(id, sender);
        debug!(project_id = %project_id, subscriber = %id, "joined project channel");
        Subscription {
            project_id,
            id,
            receiver,
            registry: Arc::clone(&self.registry),
        }
    }

    /// Removes a subscriber; returns `false` when it was not a member.
    pub fn leave(&self, project_id: ProjectId, subscriber: SubscriberId) -> bool {
        let removed = self.registry.remove(project_id, subscriber);
        if removed {
            debug!(project_id = %project_id, subscriber = %subscriber, "left project channel");
        }
        removed
    }

    /// Returns the number of current subscribers of `project_id`.
    #[must_use]
    pub fn subscriber_count(&self, project_id: ProjectId) -> usize {
        self.registry
            .channels
            .get(&project_id)
            .map_or(0, |members| members.len())
    }

    /// Returns the identifiers of the current subscribers of `project_id`.
    #[must_use]
    pub fn members(&self, project_id: ProjectId) -> Vec<SubscriberId> {
        let mut ids: Vec<SubscriberId> = self
            .registry
            .channels
            .get(&project_id)
            .map(|members| members.keys().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    /// Sends `event` to every subscriber of `project_id` without waiting.
    ///
    /// Subscribers whose buffer is full or whose receiver is gone are logged
    /// and removed.
    pub fn broadcast(&self, project_id: ProjectId, event: BoardEvent) -> PublishReport {
        let mut report = PublishReport::default();
        let Some(mut members) = self.registry.channels.get_mut(&project_id) else {
            return report;
        };
        let shared = Arc::new(event);
        members.retain(|subscriber, sender| match sender.try_send(Arc::clone(&shared)) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(err) => {
                let failure = BroadcastFailure::from_send_error(project_id, *subscriber, &err);
                warn!(event = shared.name(), error = %failure, "dropping board subscriber");
                report.failed += 1;
                false
            }
        });
        drop(members);
        if report.failed > 0 {
            self.registry
                .channels
                .remove_if(&project_id, |_, remaining| remaining.is_empty());
        }
        report
    }
}

impl BoardEventPublisher for ProjectChannels {
    fn publish(&self, project_id: ProjectId, event: BoardEvent) -> PublishReport {
        self.broadcast(project_id, event)
    }
}

/// Membership of one client in a project channel.
#[derive(Debug)]
pub struct Subscription {
    project_id: ProjectId,
    id: SubscriberId,
    receiver: mpsc::Receiver<Arc<BoardEvent>>,
    registry: Arc<Registry>,
}

impl Subscription {
    /// Returns the watched project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns this subscriber's identifier.
    #[must_use]
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next event. Returns `None` once the subscriber has been
    /// removed from the channel and every buffered event was read.
    pub async fn recv(&mut self) -> Option<Arc<BoardEvent>> {
        self.receiver.recv().await
    }

    /// Returns the next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<BoardEvent>> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.remove(self.project_id, self.id);
    }
}
