//! The `TopicStore` and `UserDirectory` port traits.
//!
//! The traits are implemented by storage backends (e.g.
//! `moot-store-sqlite`). The service layer depends on these abstractions,
//! not on any concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  engagement::{Subscription, View},
  post::{NewPost, Post},
  query::TopicQuery,
  topic::{ModerationState, NewTopic, Topic},
};

// ─── Storage port ────────────────────────────────────────────────────────────

/// Abstraction over the durable record store for topics, posts, views,
/// and subscriptions.
///
/// Implementations own id and timestamp assignment. Two methods carry
/// atomicity contracts the service relies on: [`transition_state`] must
/// be a linearizable compare-and-set, and [`record_view`] must be an
/// atomic upsert-with-increment per `(topic, user)` pair.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
///
/// [`transition_state`]: TopicStore::transition_state
/// [`record_view`]: TopicStore::record_view
pub trait TopicStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Topics ────────────────────────────────────────────────────────────

  /// Persist a new topic together with its first post, in one
  /// transaction. The topic starts in `pending_review` with all flags
  /// clear; the first post is attributed to the topic's author and
  /// starts unapproved. `last_post_at` equals the post's `created_at`.
  fn create_topic(
    &self,
    input: NewTopic,
  ) -> impl Future<Output = Result<(Topic, Post), Self::Error>> + Send + '_;

  /// Retrieve a topic by id. Returns `None` if not found.
  fn get_topic(
    &self,
    topic_id: Uuid,
  ) -> impl Future<Output = Result<Option<Topic>, Self::Error>> + Send + '_;

  /// List topics matching `query`, in the query's order. The result is
  /// finite; re-running the same query restarts the sequence.
  fn list_topics<'a>(
    &'a self,
    query: &'a TopicQuery,
  ) -> impl Future<Output = Result<Vec<Topic>, Self::Error>> + Send + 'a;

  /// Delete a topic and everything it owns (posts, views,
  /// subscriptions). Returns `false` if no such topic existed.
  fn delete_topic(
    &self,
    topic_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Compare-and-set the moderation state: succeeds iff the stored state
  /// still equals `from`. Must be linearizable — of N concurrent calls
  /// with the same `from`, at most one returns `true`.
  fn transition_state(
    &self,
    topic_id: Uuid,
    from: ModerationState,
    to: ModerationState,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Single-field flag updates. Each returns `false` when the topic does
  /// not exist.
  fn set_locked(
    &self,
    topic_id: Uuid,
    locked: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn set_pinned(
    &self,
    topic_id: Uuid,
    pinned: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn set_hidden(
    &self,
    topic_id: Uuid,
    hidden: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Posts ─────────────────────────────────────────────────────────────

  /// The topic's first post — ordered by `created_at`, tie-break by post
  /// id. `None` only if the topic has no posts (or does not exist).
  fn first_post(
    &self,
    topic_id: Uuid,
  ) -> impl Future<Output = Result<Option<Post>, Self::Error>> + Send + '_;

  /// Append a post to an existing topic and bump the topic's
  /// `last_post_at` to the post's `created_at`, in one transaction.
  fn add_post(
    &self,
    input: NewPost,
  ) -> impl Future<Output = Result<Post, Self::Error>> + Send + '_;

  /// Mark a post approved. Returns `false` when the post does not exist.
  fn approve_post(
    &self,
    post_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Subscriptions ─────────────────────────────────────────────────────

  /// Create a subscription row. The `(topic, subscriber)` pair is unique;
  /// a duplicate insert (e.g. two racing subscribes) fails with the
  /// backend's constraint error.
  fn create_subscription(
    &self,
    topic_id: Uuid,
    subscriber_id: Uuid,
  ) -> impl Future<Output = Result<Subscription, Self::Error>> + Send + '_;

  /// Delete all subscription rows for the pair and return how many were
  /// removed. Deleting all rows is deliberate — it is defensive against
  /// duplicates that predate the unique constraint.
  fn delete_subscriptions(
    &self,
    topic_id: Uuid,
    subscriber_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  fn subscription_for(
    &self,
    topic_id: Uuid,
    subscriber_id: Uuid,
  ) -> impl Future<Output = Result<Option<Subscription>, Self::Error>> + Send + '_;

  // ── Views ─────────────────────────────────────────────────────────────

  /// Find-or-create the view row for the pair and increment its count,
  /// atomically. N concurrent calls must leave one row with count
  /// incremented by N.
  fn record_view(
    &self,
    topic_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<View, Self::Error>> + Send + '_;

  fn view_for(
    &self,
    topic_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<View>, Self::Error>> + Send + '_;
}

// ─── Directory port ──────────────────────────────────────────────────────────

/// A user's global approval status in the directory.
///
/// Distinct from topic moderation state: this is about the user, and once
/// a user is `Approved` their future topics skip review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
  #[default]
  Pending,
  Approved,
}

/// Read/write access to users' global approval status.
///
/// Users not yet known to the directory read as
/// [`ApprovalStatus::Pending`].
pub trait UserDirectory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn approval_status(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<ApprovalStatus, Self::Error>> + Send + '_;

  fn set_approval_status(
    &self,
    user_id: Uuid,
    status: ApprovalStatus,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
