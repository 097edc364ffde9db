//! Per-user engagement records owned by a topic.
//!
//! Both records are unique per `(topic, user)` pair — the store enforces
//! that with a unique constraint — and are destroyed with the topic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A per-user visit counter on a topic. Created lazily on first view;
/// `count` only ever increments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct View {
  pub view_id:        Uuid,
  pub topic_id:       Uuid,
  pub user_id:        Uuid,
  pub count:          u64,
  pub last_viewed_at: DateTime<Utc>,
}

/// A user's opt-in to notifications for a topic's activity. Existence is
/// the whole signal; there is no payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
  pub subscription_id: Uuid,
  pub topic_id:        Uuid,
  pub subscriber_id:   Uuid,
  pub created_at:      DateTime<Utc>,
}
