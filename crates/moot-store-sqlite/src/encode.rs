//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Enums are stored as
//! their snake_case names. UUIDs are stored as hyphenated lowercase
//! strings; flags as INTEGER 0/1.

use chrono::{DateTime, Utc};
use moot_core::{
  engagement::{Subscription, View},
  post::Post,
  store::ApprovalStatus,
  topic::{ModerationState, Topic},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── ModerationState ─────────────────────────────────────────────────────────

pub fn encode_state(s: ModerationState) -> &'static str {
  match s {
    ModerationState::PendingReview => "pending_review",
    ModerationState::Spam => "spam",
    ModerationState::Approved => "approved",
  }
}

pub fn decode_state(s: &str) -> Result<ModerationState> {
  match s {
    "pending_review" => Ok(ModerationState::PendingReview),
    "spam" => Ok(ModerationState::Spam),
    "approved" => Ok(ModerationState::Approved),
    other => Err(Error::Decode(format!("unknown moderation state: {other:?}"))),
  }
}

// ─── ApprovalStatus ──────────────────────────────────────────────────────────

pub fn encode_approval(s: ApprovalStatus) -> &'static str {
  match s {
    ApprovalStatus::Pending => "pending",
    ApprovalStatus::Approved => "approved",
  }
}

pub fn decode_approval(s: &str) -> Result<ApprovalStatus> {
  match s {
    "pending" => Ok(ApprovalStatus::Pending),
    "approved" => Ok(ApprovalStatus::Approved),
    other => Err(Error::Decode(format!("unknown approval status: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `topics` row.
pub struct RawTopic {
  pub topic_id:     String,
  pub forum_id:     String,
  pub user_id:      String,
  pub subject:      String,
  pub state:        String,
  pub locked:       bool,
  pub pinned:       bool,
  pub hidden:       bool,
  pub created_at:   String,
  pub last_post_at: String,
}

impl RawTopic {
  pub fn into_topic(self) -> Result<Topic> {
    Ok(Topic {
      topic_id:     decode_uuid(&self.topic_id)?,
      forum_id:     decode_uuid(&self.forum_id)?,
      user_id:      decode_uuid(&self.user_id)?,
      subject:      self.subject,
      state:        decode_state(&self.state)?,
      locked:       self.locked,
      pinned:       self.pinned,
      hidden:       self.hidden,
      created_at:   decode_dt(&self.created_at)?,
      last_post_at: decode_dt(&self.last_post_at)?,
    })
  }
}

/// Raw values read directly from a `posts` row.
pub struct RawPost {
  pub post_id:    String,
  pub topic_id:   String,
  pub user_id:    String,
  pub body:       String,
  pub approved:   bool,
  pub created_at: String,
}

impl RawPost {
  pub fn into_post(self) -> Result<Post> {
    Ok(Post {
      post_id:    decode_uuid(&self.post_id)?,
      topic_id:   decode_uuid(&self.topic_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      body:       self.body,
      approved:   self.approved,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `views` row.
pub struct RawView {
  pub view_id:        String,
  pub topic_id:       String,
  pub user_id:        String,
  pub count:          i64,
  pub last_viewed_at: String,
}

impl RawView {
  pub fn into_view(self) -> Result<View> {
    Ok(View {
      view_id:        decode_uuid(&self.view_id)?,
      topic_id:       decode_uuid(&self.topic_id)?,
      user_id:        decode_uuid(&self.user_id)?,
      count:          self.count as u64,
      last_viewed_at: decode_dt(&self.last_viewed_at)?,
    })
  }
}

/// Raw values read directly from a `subscriptions` row.
pub struct RawSubscription {
  pub subscription_id: String,
  pub topic_id:        String,
  pub subscriber_id:   String,
  pub created_at:      String,
}

impl RawSubscription {
  pub fn into_subscription(self) -> Result<Subscription> {
    Ok(Subscription {
      subscription_id: decode_uuid(&self.subscription_id)?,
      topic_id:        decode_uuid(&self.topic_id)?,
      subscriber_id:   decode_uuid(&self.subscriber_id)?,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}
