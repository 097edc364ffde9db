//! Integration tests for the topic service against an in-memory store.

use moot_core::{
  post::NewPost,
  query::TopicQuery,
  service::Topics,
  store::{ApprovalStatus, TopicStore, UserDirectory},
  topic::{ModerationState, NewTopic},
  Error,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn service() -> (Topics<SqliteStore, SqliteStore>, SqliteStore) {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  (Topics::new(store.clone(), store.clone()), store)
}

fn new_topic(forum_id: Uuid, user_id: Uuid, subject: &str) -> NewTopic {
  NewTopic::new(forum_id, user_id, subject, "first post")
}

// ─── Creation ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_starts_pending_and_subscribes_author() {
  let (topics, store) = service().await;
  let author = Uuid::new_v4();

  let topic = topics
    .create(new_topic(Uuid::new_v4(), author, "hello world"))
    .await
    .unwrap();

  assert_eq!(topic.state, ModerationState::PendingReview);
  assert!(!topic.locked && !topic.pinned && !topic.hidden);
  assert!(topics.is_subscribed(topic.topic_id, author).await.unwrap());

  // The first post exists, is attributed to the author, and is not yet
  // approved.
  let first = store.first_post(topic.topic_id).await.unwrap().unwrap();
  assert_eq!(first.user_id, author);
  assert!(!first.approved);
}

#[tokio::test]
async fn create_rejects_blank_subject_and_body() {
  let (topics, _store) = service().await;
  let forum = Uuid::new_v4();
  let user = Uuid::new_v4();

  let err = topics
    .create(NewTopic::new(forum, user, "  ", "body"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EmptySubject));

  let err = topics
    .create(NewTopic::new(forum, user, "subject", ""))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EmptyPostBody));

  // Nothing was persisted.
  let all = topics.list(&TopicQuery::default()).await.unwrap();
  assert!(all.is_empty());
}

#[tokio::test]
async fn approved_author_skips_review_on_create() {
  let (topics, store) = service().await;
  let author = Uuid::new_v4();
  store
    .set_approval_status(author, ApprovalStatus::Approved)
    .await
    .unwrap();

  let topic = topics
    .create(new_topic(Uuid::new_v4(), author, "pre-approved"))
    .await
    .unwrap();

  assert_eq!(topic.state, ModerationState::Approved);
  let first = store.first_post(topic.topic_id).await.unwrap().unwrap();
  assert!(first.approved);
  // Directory status untouched (already approved).
  let status = store.approval_status(author).await.unwrap();
  assert_eq!(status, ApprovalStatus::Approved);
}

// ─── Moderation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn approve_succeeds_once_then_is_terminal() {
  let (topics, _store) = service().await;
  let topic = topics
    .create(new_topic(Uuid::new_v4(), Uuid::new_v4(), "review me"))
    .await
    .unwrap();

  let approved = topics.approve(topic.topic_id).await.unwrap();
  assert_eq!(approved.state, ModerationState::Approved);

  let err = topics.approve(topic.topic_id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::InvalidTransition { from: ModerationState::Approved, .. }
  ));
  let err = topics.mark_spam(topic.topic_id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::InvalidTransition { from: ModerationState::Approved, .. }
  ));
}

#[tokio::test]
async fn spam_is_terminal() {
  let (topics, _store) = service().await;
  let topic = topics
    .create(new_topic(Uuid::new_v4(), Uuid::new_v4(), "v1agra"))
    .await
    .unwrap();

  let spammed = topics.mark_spam(topic.topic_id).await.unwrap();
  assert_eq!(spammed.state, ModerationState::Spam);

  let err = topics.approve(topic.topic_id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::InvalidTransition { from: ModerationState::Spam, .. }
  ));
}

#[tokio::test]
async fn approve_cascades_to_first_post_and_directory() {
  let (topics, store) = service().await;
  let author = Uuid::new_v4();
  let topic = topics
    .create(new_topic(Uuid::new_v4(), author, "cascade"))
    .await
    .unwrap();

  assert_eq!(
    store.approval_status(author).await.unwrap(),
    ApprovalStatus::Pending
  );

  topics.approve(topic.topic_id).await.unwrap();

  let first = store.first_post(topic.topic_id).await.unwrap().unwrap();
  assert!(first.approved);
  assert_eq!(
    store.approval_status(author).await.unwrap(),
    ApprovalStatus::Approved
  );
}

#[tokio::test]
async fn concurrent_approves_have_one_winner() {
  let (topics, _store) = service().await;
  let topic = topics
    .create(new_topic(Uuid::new_v4(), Uuid::new_v4(), "contested"))
    .await
    .unwrap();

  let mut handles = vec![];
  for _ in 0..4 {
    let topics = topics.clone();
    let id = topic.topic_id;
    handles.push(tokio::spawn(async move { topics.approve(id).await }));
  }

  let mut wins = 0;
  for handle in handles {
    match handle.await.unwrap() {
      Ok(t) => {
        assert_eq!(t.state, ModerationState::Approved);
        wins += 1;
      }
      Err(e) => assert!(matches!(e, Error::InvalidTransition { .. })),
    }
  }
  assert_eq!(wins, 1);
}

#[tokio::test]
async fn moderating_a_missing_topic_is_not_found() {
  let (topics, _store) = service().await;
  let err = topics.approve(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::TopicNotFound(_)));
}

// ─── Flags and replies ───────────────────────────────────────────────────────

#[tokio::test]
async fn locked_topics_refuse_replies() {
  let (topics, _store) = service().await;
  let topic = topics
    .create(new_topic(Uuid::new_v4(), Uuid::new_v4(), "debate"))
    .await
    .unwrap();

  topics.lock(topic.topic_id).await.unwrap();
  let locked = topics.get(topic.topic_id).await.unwrap();
  assert!(locked.locked);
  assert!(!locked.can_be_replied_to());

  let err = topics
    .reply(NewPost::new(topic.topic_id, Uuid::new_v4(), "me too"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::TopicLocked(_)));

  topics.unlock(topic.topic_id).await.unwrap();
  topics
    .reply(NewPost::new(topic.topic_id, Uuid::new_v4(), "me too"))
    .await
    .unwrap();
}

#[tokio::test]
async fn reply_bumps_last_post_at() {
  let (topics, _store) = service().await;
  let topic = topics
    .create(new_topic(Uuid::new_v4(), Uuid::new_v4(), "fresh"))
    .await
    .unwrap();

  let post = topics
    .reply(NewPost::new(topic.topic_id, Uuid::new_v4(), "bump"))
    .await
    .unwrap();

  let after = topics.get(topic.topic_id).await.unwrap();
  assert_eq!(after.last_post_at, post.created_at);
  assert!(after.last_post_at > topic.last_post_at);
}

#[tokio::test]
async fn pin_and_hide_are_single_field_updates() {
  let (topics, _store) = service().await;
  let topic = topics
    .create(new_topic(Uuid::new_v4(), Uuid::new_v4(), "flags"))
    .await
    .unwrap();

  topics.pin(topic.topic_id).await.unwrap();
  topics.hide(topic.topic_id).await.unwrap();
  let t = topics.get(topic.topic_id).await.unwrap();
  assert!(t.pinned && t.hidden);
  // Flags never touch the state machine.
  assert_eq!(t.state, ModerationState::PendingReview);

  topics.unpin(topic.topic_id).await.unwrap();
  topics.unhide(topic.topic_id).await.unwrap();
  let t = topics.get(topic.topic_id).await.unwrap();
  assert!(!t.pinned && !t.hidden);

  let err = topics.pin(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::TopicNotFound(_)));
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

#[tokio::test]
async fn subscribe_is_idempotent() {
  let (topics, store) = service().await;
  let topic = topics
    .create(new_topic(Uuid::new_v4(), Uuid::new_v4(), "notify me"))
    .await
    .unwrap();
  let user = Uuid::new_v4();

  topics.subscribe(topic.topic_id, Some(user)).await.unwrap();
  topics.subscribe(topic.topic_id, Some(user)).await.unwrap();

  assert!(topics.is_subscribed(topic.topic_id, user).await.unwrap());
  // Exactly one row existed for the pair.
  let removed = store
    .delete_subscriptions(topic.topic_id, user)
    .await
    .unwrap();
  assert_eq!(removed, 1);
  assert!(!topics.is_subscribed(topic.topic_id, user).await.unwrap());
}

#[tokio::test]
async fn anonymous_subscribe_is_a_noop() {
  let (topics, _store) = service().await;
  let topic = topics
    .create(new_topic(Uuid::new_v4(), Uuid::new_v4(), "quiet"))
    .await
    .unwrap();

  topics.subscribe(topic.topic_id, None).await.unwrap();
  // Only the author's auto-subscription exists.
  assert!(topics
    .is_subscribed(topic.topic_id, topic.user_id)
    .await
    .unwrap());
}

#[tokio::test]
async fn unsubscribe_missing_is_a_noop() {
  let (topics, _store) = service().await;
  let topic = topics
    .create(new_topic(Uuid::new_v4(), Uuid::new_v4(), "nobody home"))
    .await
    .unwrap();

  topics.unsubscribe(topic.topic_id, Uuid::new_v4()).await.unwrap();
}

// ─── Views ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn views_accumulate_per_user() {
  let (topics, _store) = service().await;
  let topic = topics
    .create(new_topic(Uuid::new_v4(), Uuid::new_v4(), "popular"))
    .await
    .unwrap();
  let reader = Uuid::new_v4();

  for _ in 0..3 {
    topics.register_view(topic.topic_id, Some(reader)).await.unwrap();
  }

  let view = topics
    .view_for(topic.topic_id, reader)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(view.count, 3);

  // A different reader gets their own counter.
  let other = Uuid::new_v4();
  topics.register_view(topic.topic_id, Some(other)).await.unwrap();
  let view = topics.view_for(topic.topic_id, other).await.unwrap().unwrap();
  assert_eq!(view.count, 1);
}

#[tokio::test]
async fn anonymous_views_are_not_tracked() {
  let (topics, _store) = service().await;
  let topic = topics
    .create(new_topic(Uuid::new_v4(), Uuid::new_v4(), "lurkers"))
    .await
    .unwrap();

  topics.register_view(topic.topic_id, None).await.unwrap();
  // No way to look up a row that was never keyed; just assert a named
  // reader still starts from zero.
  assert!(topics
    .view_for(topic.topic_id, Uuid::new_v4())
    .await
    .unwrap()
    .is_none());
}

#[tokio::test]
async fn concurrent_views_lose_no_increments() {
  let (topics, _store) = service().await;
  let topic = topics
    .create(new_topic(Uuid::new_v4(), Uuid::new_v4(), "stampede"))
    .await
    .unwrap();
  let reader = Uuid::new_v4();

  let mut handles = vec![];
  for _ in 0..10 {
    let topics = topics.clone();
    let id = topic.topic_id;
    handles.push(tokio::spawn(async move {
      topics.register_view(id, Some(reader)).await
    }));
  }
  for handle in handles {
    handle.await.unwrap().unwrap();
  }

  let view = topics
    .view_for(topic.topic_id, reader)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(view.count, 10);
}

// ─── Listings ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn front_page_orders_pinned_then_most_recent() {
  let (topics, _store) = service().await;
  let forum = Uuid::new_v4();
  let user = Uuid::new_v4();

  // Created in order: pinned (oldest post), then a, then b (newest post).
  let pinned = topics.create(new_topic(forum, user, "pinned")).await.unwrap();
  let a = topics.create(new_topic(forum, user, "a")).await.unwrap();
  let b = topics.create(new_topic(forum, user, "b")).await.unwrap();
  topics.pin(pinned.topic_id).await.unwrap();

  let listed = topics
    .list(&TopicQuery::default().by_pinned_or_most_recent_post())
    .await
    .unwrap();
  let ids: Vec<_> = listed.iter().map(|t| t.topic_id).collect();
  assert_eq!(ids, vec![pinned.topic_id, b.topic_id, a.topic_id]);

  // Without the pin dimension, recency alone governs.
  let listed = topics
    .list(&TopicQuery::default().by_most_recent_post())
    .await
    .unwrap();
  let ids: Vec<_> = listed.iter().map(|t| t.topic_id).collect();
  assert_eq!(ids, vec![b.topic_id, a.topic_id, pinned.topic_id]);

  // Pinned-only ordering still floats the pinned topic to the front.
  let listed = topics
    .list(&TopicQuery::default().by_pinned())
    .await
    .unwrap();
  assert_eq!(listed[0].topic_id, pinned.topic_id);
}

#[tokio::test]
async fn visible_excludes_hidden_topics() {
  let (topics, _store) = service().await;
  let forum = Uuid::new_v4();
  let user = Uuid::new_v4();

  let shown = topics.create(new_topic(forum, user, "shown")).await.unwrap();
  let hidden = topics.create(new_topic(forum, user, "hidden")).await.unwrap();
  topics.hide(hidden.topic_id).await.unwrap();

  let listed = topics.list(&TopicQuery::default().visible()).await.unwrap();
  let ids: Vec<_> = listed.iter().map(|t| t.topic_id).collect();
  assert_eq!(ids, vec![shown.topic_id]);
}

#[tokio::test]
async fn users_see_approved_plus_their_own_pending() {
  let (topics, _store) = service().await;
  let forum = Uuid::new_v4();
  let me = Uuid::new_v4();
  let other = Uuid::new_v4();

  let mine_pending = topics.create(new_topic(forum, me, "mine")).await.unwrap();
  let theirs_pending = topics.create(new_topic(forum, other, "theirs")).await.unwrap();
  let public = topics.create(new_topic(forum, other, "public")).await.unwrap();
  topics.approve(public.topic_id).await.unwrap();
  let junk = topics.create(new_topic(forum, other, "junk")).await.unwrap();
  topics.mark_spam(junk.topic_id).await.unwrap();

  let listed = topics
    .list(&TopicQuery::default().approved_or_pending_review_for(Some(me)))
    .await
    .unwrap();
  let ids: Vec<_> = listed.iter().map(|t| t.topic_id).collect();
  assert!(ids.contains(&mine_pending.topic_id));
  assert!(ids.contains(&public.topic_id));
  assert!(!ids.contains(&theirs_pending.topic_id));
  assert!(!ids.contains(&junk.topic_id));

  // Anonymous readers get approved topics only.
  let listed = topics
    .list(&TopicQuery::default().approved_or_pending_review_for(None))
    .await
    .unwrap();
  let ids: Vec<_> = listed.iter().map(|t| t.topic_id).collect();
  assert_eq!(ids, vec![public.topic_id]);
}

#[tokio::test]
async fn exact_state_scopes_filter() {
  let (topics, _store) = service().await;
  let forum = Uuid::new_v4();
  let user = Uuid::new_v4();

  let pending = topics.create(new_topic(forum, user, "pending")).await.unwrap();
  let approved = topics.create(new_topic(forum, user, "approved")).await.unwrap();
  topics.approve(approved.topic_id).await.unwrap();

  let listed = topics
    .list(&TopicQuery::default().pending_review())
    .await
    .unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].topic_id, pending.topic_id);

  let listed = topics.list(&TopicQuery::default().approved()).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].topic_id, approved.topic_id);
}

// ─── Destruction ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_cascades_to_children() {
  let (topics, store) = service().await;
  let reader = Uuid::new_v4();
  let topic = topics
    .create(new_topic(Uuid::new_v4(), Uuid::new_v4(), "doomed"))
    .await
    .unwrap();
  topics.register_view(topic.topic_id, Some(reader)).await.unwrap();
  topics.subscribe(topic.topic_id, Some(reader)).await.unwrap();

  topics.delete(topic.topic_id).await.unwrap();

  let err = topics.get(topic.topic_id).await.unwrap_err();
  assert!(matches!(err, Error::TopicNotFound(_)));
  assert!(store.first_post(topic.topic_id).await.unwrap().is_none());
  assert!(store.view_for(topic.topic_id, reader).await.unwrap().is_none());
  assert!(store
    .subscription_for(topic.topic_id, reader)
    .await
    .unwrap()
    .is_none());

  let err = topics.delete(topic.topic_id).await.unwrap_err();
  assert!(matches!(err, Error::TopicNotFound(_)));
}

// ─── Directory ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_users_read_as_pending() {
  let (_topics, store) = service().await;
  let status = store.approval_status(Uuid::new_v4()).await.unwrap();
  assert_eq!(status, ApprovalStatus::Pending);
}

// ─── Durability ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn file_backed_store_survives_reopen() {
  let dir = tempfile::tempdir().expect("tempdir");
  let path = dir.path().join("moot.db");

  let topic_id = {
    let store = SqliteStore::open(&path).await.unwrap();
    let topics = Topics::new(store.clone(), store);
    let topic = topics
      .create(new_topic(Uuid::new_v4(), Uuid::new_v4(), "durable"))
      .await
      .unwrap();
    topics.approve(topic.topic_id).await.unwrap();
    topic.topic_id
  };

  let store = SqliteStore::open(&path).await.unwrap();
  let topics = Topics::new(store.clone(), store);
  let topic = topics.get(topic_id).await.unwrap();
  assert_eq!(topic.state, ModerationState::Approved);
}
