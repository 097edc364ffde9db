//! Topic — the root entity of a forum thread, and its moderation state
//! machine.
//!
//! The state machine is deliberately small: two legal edges out of
//! `pending_review`, both into terminal states. It is expressed as a pure
//! transition function so the rules can be checked without a store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Moderation state ────────────────────────────────────────────────────────

/// The moderation state of a topic.
///
/// Every topic starts in `PendingReview`. `Spam` and `Approved` are
/// terminal; there is no edge out of either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationState {
  PendingReview,
  Spam,
  Approved,
}

/// An event applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicEvent {
  Approve,
  MarkSpam,
}

impl ModerationState {
  /// Apply `event` and return the resulting state, or
  /// [`Error::InvalidTransition`] if the edge does not exist.
  pub fn apply(self, event: TopicEvent) -> Result<ModerationState> {
    match (self, event) {
      (Self::PendingReview, TopicEvent::Approve) => Ok(Self::Approved),
      (Self::PendingReview, TopicEvent::MarkSpam) => Ok(Self::Spam),
      (from, event) => Err(Error::InvalidTransition { from, event }),
    }
  }

  pub fn is_terminal(self) -> bool { !matches!(self, Self::PendingReview) }
}

impl fmt::Display for ModerationState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::PendingReview => "pending_review",
      Self::Spam => "spam",
      Self::Approved => "approved",
    })
  }
}

impl fmt::Display for TopicEvent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Approve => "approve",
      Self::MarkSpam => "mark_spam",
    })
  }
}

// ─── Topic ───────────────────────────────────────────────────────────────────

/// A forum thread. Owns its posts, views, and subscriptions (the store
/// cascade-deletes them with the topic); the forum and author are
/// referenced, not owned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
  pub topic_id:     Uuid,
  pub forum_id:     Uuid,
  /// The author. The first post is always attributed to this user.
  pub user_id:      Uuid,
  pub subject:      String,
  pub state:        ModerationState,
  pub locked:       bool,
  pub pinned:       bool,
  pub hidden:       bool,
  pub created_at:   DateTime<Utc>,
  /// Timestamp of the most recent post; drives the front-page ordering.
  pub last_post_at: DateTime<Utc>,
}

impl Topic {
  /// A topic cannot be replied to while it is locked. Moderation state
  /// has no bearing on this.
  pub fn can_be_replied_to(&self) -> bool { !self.locked }
}

// ─── NewTopic ────────────────────────────────────────────────────────────────

/// Input to [`Topics::create`](crate::service::Topics::create).
///
/// A topic is never created without a first post; the two are persisted
/// in one transaction and the post is attributed to `user_id` regardless
/// of who submitted the form.
#[derive(Debug, Clone)]
pub struct NewTopic {
  pub forum_id:        Uuid,
  pub user_id:         Uuid,
  pub subject:         String,
  pub first_post_body: String,
}

impl NewTopic {
  pub fn new(
    forum_id: Uuid,
    user_id: Uuid,
    subject: impl Into<String>,
    first_post_body: impl Into<String>,
  ) -> Self {
    Self {
      forum_id,
      user_id,
      subject: subject.into(),
      first_post_body: first_post_body.into(),
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
