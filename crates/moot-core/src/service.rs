//! [`Topics`] — the service that owns topic lifecycle rules.
//!
//! Everything the storage layer used to do implicitly (save hooks, scope
//! chaining) is an explicit, ordered step here: create validates, then
//! persists, then subscribes the author, then maybe auto-approves;
//! approval wins a compare-and-set before its cascade runs. The service
//! holds no state of its own — both ports are the source of truth.

use uuid::Uuid;

use crate::{
  engagement::{Subscription, View},
  error::{Error, Result},
  post::{NewPost, Post},
  query::TopicQuery,
  store::{ApprovalStatus, TopicStore, UserDirectory},
  topic::{ModerationState, NewTopic, Topic, TopicEvent},
};

/// The topic moderation and subscription service.
///
/// Generic over the storage and directory ports; in production both are
/// usually the same backend value.
#[derive(Clone)]
pub struct Topics<S, D> {
  store:     S,
  directory: D,
}

impl<S, D> Topics<S, D>
where
  S: TopicStore,
  D: UserDirectory,
{
  pub fn new(store: S, directory: D) -> Self { Self { store, directory } }

  // ── Lifecycle ─────────────────────────────────────────────────────────

  /// Create a topic with its first post.
  ///
  /// Validates the subject and body, persists both records in one
  /// transaction (the post attributed to the topic's author), subscribes
  /// the author, and — if the author's directory status is already
  /// `approved` — immediately approves the topic, skipping review. That
  /// auto-approval happens here and only here; it never re-fires on
  /// later writes to the topic.
  pub async fn create(&self, input: NewTopic) -> Result<Topic> {
    if input.subject.trim().is_empty() {
      return Err(Error::EmptySubject);
    }
    if input.first_post_body.trim().is_empty() {
      return Err(Error::EmptyPostBody);
    }

    let (topic, _first_post) = self
      .store
      .create_topic(input)
      .await
      .map_err(Error::persistence)?;
    tracing::info!(topic_id = %topic.topic_id, "topic created");

    self.subscribe(topic.topic_id, Some(topic.user_id)).await?;

    let status = self
      .directory
      .approval_status(topic.user_id)
      .await
      .map_err(Error::persistence)?;
    if status == ApprovalStatus::Approved {
      return self.approve(topic.topic_id).await;
    }

    Ok(topic)
  }

  /// Retrieve a topic, or [`Error::TopicNotFound`].
  pub async fn get(&self, topic_id: Uuid) -> Result<Topic> {
    self
      .store
      .get_topic(topic_id)
      .await
      .map_err(Error::persistence)?
      .ok_or(Error::TopicNotFound(topic_id))
  }

  /// Destroy a topic and everything it owns.
  pub async fn delete(&self, topic_id: Uuid) -> Result<()> {
    let deleted = self
      .store
      .delete_topic(topic_id)
      .await
      .map_err(Error::persistence)?;
    if !deleted {
      return Err(Error::TopicNotFound(topic_id));
    }
    tracing::info!(topic_id = %topic_id, "topic deleted");
    Ok(())
  }

  // ── Moderation ────────────────────────────────────────────────────────

  /// Approve a topic under review. Fails with
  /// [`Error::InvalidTransition`] from any other state.
  pub async fn approve(&self, topic_id: Uuid) -> Result<Topic> {
    self.transition(topic_id, TopicEvent::Approve).await
  }

  /// Mark a topic under review as spam. Fails with
  /// [`Error::InvalidTransition`] from any other state.
  pub async fn mark_spam(&self, topic_id: Uuid) -> Result<Topic> {
    self.transition(topic_id, TopicEvent::MarkSpam).await
  }

  async fn transition(&self, topic_id: Uuid, event: TopicEvent) -> Result<Topic> {
    let topic = self.get(topic_id).await?;
    let next = topic.state.apply(event)?;

    let won = self
      .store
      .transition_state(topic_id, topic.state, next)
      .await
      .map_err(Error::persistence)?;
    if !won {
      // Lost the compare-and-set; report the state that actually won.
      let current = self.get(topic_id).await?;
      return Err(Error::InvalidTransition { from: current.state, event });
    }
    tracing::info!(topic_id = %topic_id, state = %next, "topic state changed");

    if next == ModerationState::Approved {
      self.cascade_approval(&topic).await?;
    }

    Ok(Topic { state: next, ..topic })
  }

  /// The side effects of a transition into `approved`. Runs exactly once
  /// per transition — the caller holds the compare-and-set win.
  ///
  /// Ordered: first-post approval, then the directory write. If the post
  /// write fails the directory is left untouched and the error
  /// propagates; the topic's own state change is not rolled back.
  async fn cascade_approval(&self, topic: &Topic) -> Result<()> {
    let first = self
      .store
      .first_post(topic.topic_id)
      .await
      .map_err(Error::persistence)?
      .ok_or(Error::FirstPostNotFound(topic.topic_id))?;
    if !first.approved {
      self
        .store
        .approve_post(first.post_id)
        .await
        .map_err(Error::persistence)?;
    }

    let status = self
      .directory
      .approval_status(topic.user_id)
      .await
      .map_err(Error::persistence)?;
    if status != ApprovalStatus::Approved {
      self
        .directory
        .set_approval_status(topic.user_id, ApprovalStatus::Approved)
        .await
        .map_err(Error::persistence)?;
    }

    tracing::debug!(
      topic_id = %topic.topic_id,
      user_id = %topic.user_id,
      "approval cascade complete"
    );
    Ok(())
  }

  // ── Flags ─────────────────────────────────────────────────────────────

  /// Lock a topic against replies. Independent of moderation state.
  pub async fn lock(&self, topic_id: Uuid) -> Result<()> {
    self.set_locked(topic_id, true).await
  }

  pub async fn unlock(&self, topic_id: Uuid) -> Result<()> {
    self.set_locked(topic_id, false).await
  }

  /// Pin a topic to the top of front-page orderings.
  pub async fn pin(&self, topic_id: Uuid) -> Result<()> {
    let found = self
      .store
      .set_pinned(topic_id, true)
      .await
      .map_err(Error::persistence)?;
    found.then_some(()).ok_or(Error::TopicNotFound(topic_id))
  }

  pub async fn unpin(&self, topic_id: Uuid) -> Result<()> {
    let found = self
      .store
      .set_pinned(topic_id, false)
      .await
      .map_err(Error::persistence)?;
    found.then_some(()).ok_or(Error::TopicNotFound(topic_id))
  }

  /// Hide a topic from `visible()` listings.
  pub async fn hide(&self, topic_id: Uuid) -> Result<()> {
    let found = self
      .store
      .set_hidden(topic_id, true)
      .await
      .map_err(Error::persistence)?;
    found.then_some(()).ok_or(Error::TopicNotFound(topic_id))
  }

  pub async fn unhide(&self, topic_id: Uuid) -> Result<()> {
    let found = self
      .store
      .set_hidden(topic_id, false)
      .await
      .map_err(Error::persistence)?;
    found.then_some(()).ok_or(Error::TopicNotFound(topic_id))
  }

  async fn set_locked(&self, topic_id: Uuid, locked: bool) -> Result<()> {
    let found = self
      .store
      .set_locked(topic_id, locked)
      .await
      .map_err(Error::persistence)?;
    found.then_some(()).ok_or(Error::TopicNotFound(topic_id))
  }

  // ── Replies ───────────────────────────────────────────────────────────

  /// Append a reply to a topic. Refused with [`Error::TopicLocked`] while
  /// the topic is locked; bumps the topic's `last_post_at`.
  pub async fn reply(&self, input: NewPost) -> Result<Post> {
    if input.body.trim().is_empty() {
      return Err(Error::EmptyPostBody);
    }
    let topic = self.get(input.topic_id).await?;
    if !topic.can_be_replied_to() {
      return Err(Error::TopicLocked(topic.topic_id));
    }
    let post = self.store.add_post(input).await.map_err(Error::persistence)?;
    tracing::debug!(topic_id = %post.topic_id, post_id = %post.post_id, "reply added");
    Ok(post)
  }

  // ── Subscription ledger ───────────────────────────────────────────────

  /// Subscribe a user to a topic's activity. Idempotent: a `None` user
  /// (anonymous) and an existing subscriber are both quiet no-ops. A
  /// unique-constraint race surfaces as [`Error::Persistence`], which is
  /// retryable by the caller.
  pub async fn subscribe(&self, topic_id: Uuid, user_id: Option<Uuid>) -> Result<()> {
    let Some(user_id) = user_id else {
      return Ok(());
    };
    if self.is_subscribed(topic_id, user_id).await? {
      return Ok(());
    }
    self
      .store
      .create_subscription(topic_id, user_id)
      .await
      .map_err(Error::persistence)?;
    tracing::debug!(topic_id = %topic_id, user_id = %user_id, "user subscribed");
    Ok(())
  }

  /// Remove every subscription the user holds on the topic. No-op if
  /// there are none.
  pub async fn unsubscribe(&self, topic_id: Uuid, user_id: Uuid) -> Result<()> {
    self
      .store
      .delete_subscriptions(topic_id, user_id)
      .await
      .map_err(Error::persistence)?;
    Ok(())
  }

  pub async fn is_subscribed(&self, topic_id: Uuid, user_id: Uuid) -> Result<bool> {
    Ok(self.subscription_for(topic_id, user_id).await?.is_some())
  }

  pub async fn subscription_for(
    &self,
    topic_id: Uuid,
    user_id: Uuid,
  ) -> Result<Option<Subscription>> {
    self
      .store
      .subscription_for(topic_id, user_id)
      .await
      .map_err(Error::persistence)
  }

  // ── View tracker ──────────────────────────────────────────────────────

  /// Count a visit. Anonymous viewers (`None`) are not tracked. The
  /// increment is atomic per `(topic, user)` — see
  /// [`TopicStore::record_view`].
  pub async fn register_view(&self, topic_id: Uuid, user_id: Option<Uuid>) -> Result<()> {
    let Some(user_id) = user_id else {
      return Ok(());
    };
    self
      .store
      .record_view(topic_id, user_id)
      .await
      .map_err(Error::persistence)?;
    Ok(())
  }

  pub async fn view_for(&self, topic_id: Uuid, user_id: Uuid) -> Result<Option<View>> {
    self
      .store
      .view_for(topic_id, user_id)
      .await
      .map_err(Error::persistence)
  }

  // ── Listings ──────────────────────────────────────────────────────────

  /// Run a [`TopicQuery`] against the storage port.
  pub async fn list(&self, query: &TopicQuery) -> Result<Vec<Topic>> {
    self.store.list_topics(query).await.map_err(Error::persistence)
  }
}
