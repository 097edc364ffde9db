//! The topic query facade.
//!
//! [`TopicQuery`] is a data-only description of a filtered, ordered topic
//! listing. Backends interpret it (e.g. `moot-store-sqlite` translates it
//! to SQL); this crate only composes it. A query value is reusable, so
//! the sequence it describes is restartable.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::topic::ModerationState;

/// Which moderation states a listing includes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateFilter {
  #[default]
  Any,
  Exactly(ModerationState),
  /// Approved topics, plus the given user's own pending-review topics.
  /// Users see their own unreviewed threads; nobody else does.
  ApprovedOrOwnPending(Uuid),
}

/// Listing order. Every variant tie-breaks by topic id ascending so the
/// order is total and stable across restarts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicOrder {
  #[default]
  Id,
  Pinned,
  MostRecentPost,
  /// Pinned topics first, then most-recent-post descending — the usual
  /// front-page order.
  PinnedThenMostRecentPost,
}

/// Parameters for [`TopicStore::list_topics`](crate::store::TopicStore::list_topics).
///
/// The builder methods mirror the named scopes a forum front end needs;
/// they compose, so `TopicQuery::default().visible().approved()` is a
/// valid listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicQuery {
  /// When set, only topics with `hidden = false` are returned.
  pub visible_only: bool,
  pub state:        StateFilter,
  pub order:        TopicOrder,
}

impl TopicQuery {
  pub fn visible(mut self) -> Self {
    self.visible_only = true;
    self
  }

  pub fn by_pinned(mut self) -> Self {
    self.order = TopicOrder::Pinned;
    self
  }

  pub fn by_most_recent_post(mut self) -> Self {
    self.order = TopicOrder::MostRecentPost;
    self
  }

  pub fn by_pinned_or_most_recent_post(mut self) -> Self {
    self.order = TopicOrder::PinnedThenMostRecentPost;
    self
  }

  pub fn pending_review(mut self) -> Self {
    self.state = StateFilter::Exactly(ModerationState::PendingReview);
    self
  }

  pub fn approved(mut self) -> Self {
    self.state = StateFilter::Exactly(ModerationState::Approved);
    self
  }

  /// With a user, approved topics plus that user's own pending-review
  /// topics; without one, plain [`approved`](Self::approved).
  pub fn approved_or_pending_review_for(mut self, user: Option<Uuid>) -> Self {
    self.state = match user {
      Some(user_id) => StateFilter::ApprovedOrOwnPending(user_id),
      None => StateFilter::Exactly(ModerationState::Approved),
    };
    self
  }
}
