//! In-process event hub for live updates.
//!
//! Writers publish after their transaction commits. Readers hold a
//! [`Subscription`] scoped to one topic; dropping it unsubscribes.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::models::*;

const CHANNEL_CAPACITY: usize = 256;

/// What a subscriber listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// New posts and vote changes on the board.
    Community,
    /// Comments and replies under one post.
    Post(Uuid),
    /// Events addressed to one user.
    User(Uuid),
    /// Events addressed to every member of a role.
    Role(Role),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Community => f.write_str("community"),
            Topic::Post(id) => write!(f, "post:{id}"),
            Topic::User(id) => write!(f, "user:{id}"),
            Topic::Role(role) => write!(f, "role:{role}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTopic(pub String);

impl fmt::Display for InvalidTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown topic: {}", self.0)
    }
}

impl std::error::Error for InvalidTopic {}

impl FromStr for Topic {
    type Err = InvalidTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidTopic(s.to_string());
        if s == "community" {
            return Ok(Topic::Community);
        }
        let (kind, value) = s.split_once(':').ok_or_else(invalid)?;
        match kind {
            "post" => Uuid::parse_str(value).map(Topic::Post).map_err(|_| invalid()),
            "user" => Uuid::parse_str(value).map(Topic::User).map_err(|_| invalid()),
            "role" => Role::from_str(value).map(Topic::Role).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl Topic {
    /// Whether `user` may listen on this topic.
    pub fn visible_to(&self, user: &User) -> bool {
        match self {
            Topic::Community | Topic::Post(_) => true,
            Topic::User(id) => *id == user.id,
            Topic::Role(role) => *role == user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    PostCreated {
        post: CommunityPost,
    },
    CommentAdded {
        comment: Comment,
    },
    ReplyAdded {
        post_id: Uuid,
        reply: Reply,
    },
    /// Tallies only; `user_vote` is viewer-specific and left out.
    VoteChanged {
        target: VoteTarget,
        target_id: Uuid,
        upvotes: u32,
        downvotes: u32,
        score: i64,
    },
    AppointmentChanged {
        appointment: Appointment,
    },
    DoseTaken {
        entry: MedicationLogEntry,
        remaining_count: u32,
    },
    NotificationCreated {
        notification: Notification,
    },
}

impl Event {
    pub fn vote_changed(target: VoteTarget, target_id: Uuid, tally: &VoteTally) -> Self {
        Event::VoteChanged {
            target,
            target_id,
            upvotes: tally.upvotes,
            downvotes: tally.downvotes,
            score: tally.score,
        }
    }

    /// Topics this event is delivered on.
    pub fn topics(&self) -> Vec<Topic> {
        match self {
            Event::PostCreated { .. } | Event::VoteChanged { .. } => vec![Topic::Community],
            Event::CommentAdded { comment } => vec![Topic::Community, Topic::Post(comment.post_id)],
            Event::ReplyAdded { post_id, .. } => vec![Topic::Post(*post_id)],
            Event::AppointmentChanged { appointment } => vec![
                Topic::User(appointment.patient_id),
                Topic::User(appointment.doctor_id),
            ],
            Event::DoseTaken { entry, .. } => vec![Topic::User(entry.patient_id)],
            Event::NotificationCreated { notification } => match notification.target {
                NotificationTarget::User(id) => vec![Topic::User(id)],
                NotificationTarget::Role(role) => vec![Topic::Role(role)],
            },
        }
    }
}

#[derive(Debug)]
struct Envelope {
    topics: Vec<Topic>,
    event: Event,
}

// ═══════════════════════════════════════════════════════════
// EventHub
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct EventHub {
    sender: broadcast::Sender<Arc<Envelope>>,
    active: Arc<AtomicUsize>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publish to every live subscription. No subscribers is not an error.
    pub fn publish(&self, event: Event) {
        let envelope = Arc::new(Envelope {
            topics: event.topics(),
            event,
        });
        if self.sender.send(envelope).is_err() {
            tracing::trace!("Event dropped, no subscribers");
        }
    }

    pub fn subscribe(&self, topic: Topic) -> Subscription {
        self.active.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(topic = %topic, "Subscription opened");
        Subscription {
            topic,
            receiver: self.sender.subscribe(),
            active: Arc::clone(&self.active),
        }
    }

    /// Number of live subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

// ═══════════════════════════════════════════════════════════
// Subscription: RAII listener handle
// ═══════════════════════════════════════════════════════════

/// Listener for one topic. Dropping it releases the receiver and the
/// live-subscription count.
pub struct Subscription {
    topic: Topic,
    receiver: broadcast::Receiver<Arc<Envelope>>,
    active: Arc<AtomicUsize>,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Next event on this topic, or `None` once the hub is gone.
    pub async fn next(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) if envelope.topics.contains(&self.topic) => {
                    return Some(envelope.event.clone())
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(topic = %self.topic, skipped, "Subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        tracing::debug!(topic = %self.topic, "Subscription closed");
    }
}
