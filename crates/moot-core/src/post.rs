//! Post — one message inside a topic, ordered by creation time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message inside a topic. The id and `created_at` are assigned by the
/// store; `approved` starts false and flips when the topic's approval
/// cascade reaches the first post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
  pub post_id:    Uuid,
  pub topic_id:   Uuid,
  pub user_id:    Uuid,
  pub body:       String,
  pub approved:   bool,
  pub created_at: DateTime<Utc>,
}

/// Input to [`Topics::reply`](crate::service::Topics::reply).
/// `post_id` and `created_at` are always set by the store.
#[derive(Debug, Clone)]
pub struct NewPost {
  pub topic_id: Uuid,
  pub user_id:  Uuid,
  pub body:     String,
}

impl NewPost {
  pub fn new(topic_id: Uuid, user_id: Uuid, body: impl Into<String>) -> Self {
    Self { topic_id, user_id, body: body.into() }
  }
}
