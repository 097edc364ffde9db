//! [`SqliteStore`] — the SQLite implementation of both Moot ports.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use moot_core::{
  engagement::{Subscription, View},
  post::{NewPost, Post},
  query::{StateFilter, TopicOrder, TopicQuery},
  store::{ApprovalStatus, TopicStore, UserDirectory},
  topic::{ModerationState, NewTopic, Topic},
};

use crate::{
  encode::{
    decode_approval, encode_approval, encode_dt, encode_state, encode_uuid,
    RawPost, RawSubscription, RawTopic, RawView,
  },
  schema::SCHEMA,
  Error, Result,
};

const TOPIC_COLUMNS: &str = "topic_id, forum_id, user_id, subject, state, \
                             locked, pinned, hidden, created_at, last_post_at";

fn topic_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTopic> {
  Ok(RawTopic {
    topic_id:     row.get(0)?,
    forum_id:     row.get(1)?,
    user_id:      row.get(2)?,
    subject:      row.get(3)?,
    state:        row.get(4)?,
    locked:       row.get(5)?,
    pinned:       row.get(6)?,
    hidden:       row.get(7)?,
    created_at:   row.get(8)?,
    last_post_at: row.get(9)?,
  })
}

fn post_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawPost> {
  Ok(RawPost {
    post_id:    row.get(0)?,
    topic_id:   row.get(1)?,
    user_id:    row.get(2)?,
    body:       row.get(3)?,
    approved:   row.get(4)?,
    created_at: row.get(5)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Moot store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All
/// statements for one store run serialised on a dedicated thread, which
/// is what makes the compare-and-set UPDATE and the view upsert
/// effectively atomic.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a single-column UPDATE on `topics` and report whether a row
  /// matched.
  async fn update_topic_field(
    &self,
    sql: &'static str,
    topic_id: Uuid,
    value: bool,
  ) -> Result<bool> {
    let id_str = encode_uuid(topic_id);
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute(sql, rusqlite::params![value, id_str])?))
      .await?;
    Ok(changed == 1)
  }
}

// ─── TopicStore impl ─────────────────────────────────────────────────────────

impl TopicStore for SqliteStore {
  type Error = Error;

  // ── Topics ────────────────────────────────────────────────────────────

  async fn create_topic(&self, input: NewTopic) -> Result<(Topic, Post)> {
    let now = Utc::now();
    let topic = Topic {
      topic_id:     Uuid::new_v4(),
      forum_id:     input.forum_id,
      user_id:      input.user_id,
      subject:      input.subject,
      state:        ModerationState::PendingReview,
      locked:       false,
      pinned:       false,
      hidden:       false,
      created_at:   now,
      last_post_at: now,
    };
    // The first post is always attributed to the topic's author.
    let post = Post {
      post_id:    Uuid::new_v4(),
      topic_id:   topic.topic_id,
      user_id:    topic.user_id,
      body:       input.first_post_body,
      approved:   false,
      created_at: now,
    };

    let topic_id_str = encode_uuid(topic.topic_id);
    let forum_id_str = encode_uuid(topic.forum_id);
    let user_id_str  = encode_uuid(topic.user_id);
    let subject      = topic.subject.clone();
    let state_str    = encode_state(topic.state).to_owned();
    let at_str       = encode_dt(now);
    let post_id_str  = encode_uuid(post.post_id);
    let body         = post.body.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO topics (
             topic_id, forum_id, user_id, subject, state,
             locked, pinned, hidden, created_at, last_post_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, 0, ?6, ?6)",
          rusqlite::params![
            topic_id_str,
            forum_id_str,
            user_id_str,
            subject,
            state_str,
            at_str,
          ],
        )?;
        tx.execute(
          "INSERT INTO posts (post_id, topic_id, user_id, body, approved, created_at)
           VALUES (?1, ?2, ?3, ?4, 0, ?5)",
          rusqlite::params![post_id_str, topic_id_str, user_id_str, body, at_str],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok((topic, post))
  }

  async fn get_topic(&self, topic_id: Uuid) -> Result<Option<Topic>> {
    let id_str = encode_uuid(topic_id);

    let raw: Option<RawTopic> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE topic_id = ?1"),
            rusqlite::params![id_str],
            topic_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawTopic::into_topic).transpose()
  }

  async fn list_topics<'a>(&'a self, query: &'a TopicQuery) -> Result<Vec<Topic>> {
    // Build WHERE clause dynamically; parameters are collected in order.
    let mut conds: Vec<String> = vec![];
    let mut args: Vec<String> = vec![];

    if query.visible_only {
      conds.push("hidden = 0".to_owned());
    }
    match query.state {
      StateFilter::Any => {}
      StateFilter::Exactly(state) => {
        args.push(encode_state(state).to_owned());
        conds.push(format!("state = ?{}", args.len()));
      }
      StateFilter::ApprovedOrOwnPending(user_id) => {
        args.push(encode_uuid(user_id));
        conds.push(format!(
          "(state = 'approved' OR (state = 'pending_review' AND user_id = ?{}))",
          args.len()
        ));
      }
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };

    let order_clause = match query.order {
      TopicOrder::Id => "topic_id ASC",
      TopicOrder::Pinned => "pinned DESC, topic_id ASC",
      TopicOrder::MostRecentPost => "last_post_at DESC, topic_id ASC",
      TopicOrder::PinnedThenMostRecentPost => {
        "pinned DESC, last_post_at DESC, topic_id ASC"
      }
    };

    let sql = format!(
      "SELECT {TOPIC_COLUMNS} FROM topics {where_clause} ORDER BY {order_clause}"
    );

    let raws: Vec<RawTopic> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(args), topic_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTopic::into_topic).collect()
  }

  async fn delete_topic(&self, topic_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(topic_id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM topics WHERE topic_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(changed == 1)
  }

  async fn transition_state(
    &self,
    topic_id: Uuid,
    from: ModerationState,
    to: ModerationState,
  ) -> Result<bool> {
    let id_str   = encode_uuid(topic_id);
    let from_str = encode_state(from).to_owned();
    let to_str   = encode_state(to).to_owned();

    // Conditional UPDATE; the affected-row count is the CAS verdict.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE topics SET state = ?1 WHERE topic_id = ?2 AND state = ?3",
          rusqlite::params![to_str, id_str, from_str],
        )?)
      })
      .await?;
    Ok(changed == 1)
  }

  async fn set_locked(&self, topic_id: Uuid, locked: bool) -> Result<bool> {
    self
      .update_topic_field(
        "UPDATE topics SET locked = ?1 WHERE topic_id = ?2",
        topic_id,
        locked,
      )
      .await
  }

  async fn set_pinned(&self, topic_id: Uuid, pinned: bool) -> Result<bool> {
    self
      .update_topic_field(
        "UPDATE topics SET pinned = ?1 WHERE topic_id = ?2",
        topic_id,
        pinned,
      )
      .await
  }

  async fn set_hidden(&self, topic_id: Uuid, hidden: bool) -> Result<bool> {
    self
      .update_topic_field(
        "UPDATE topics SET hidden = ?1 WHERE topic_id = ?2",
        topic_id,
        hidden,
      )
      .await
  }

  // ── Posts ─────────────────────────────────────────────────────────────

  async fn first_post(&self, topic_id: Uuid) -> Result<Option<Post>> {
    let id_str = encode_uuid(topic_id);

    let raw: Option<RawPost> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT post_id, topic_id, user_id, body, approved, created_at
             FROM posts WHERE topic_id = ?1
             ORDER BY created_at ASC, post_id ASC
             LIMIT 1",
            rusqlite::params![id_str],
            post_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawPost::into_post).transpose()
  }

  async fn add_post(&self, input: NewPost) -> Result<Post> {
    let post = Post {
      post_id:    Uuid::new_v4(),
      topic_id:   input.topic_id,
      user_id:    input.user_id,
      body:       input.body,
      approved:   false,
      created_at: Utc::now(),
    };

    let post_id_str  = encode_uuid(post.post_id);
    let topic_id_str = encode_uuid(post.topic_id);
    let user_id_str  = encode_uuid(post.user_id);
    let body         = post.body.clone();
    let at_str       = encode_dt(post.created_at);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO posts (post_id, topic_id, user_id, body, approved, created_at)
           VALUES (?1, ?2, ?3, ?4, 0, ?5)",
          rusqlite::params![post_id_str, topic_id_str, user_id_str, body, at_str],
        )?;
        tx.execute(
          "UPDATE topics SET last_post_at = ?1 WHERE topic_id = ?2",
          rusqlite::params![at_str, topic_id_str],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(post)
  }

  async fn approve_post(&self, post_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(post_id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE posts SET approved = 1 WHERE post_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(changed == 1)
  }

  // ── Subscriptions ─────────────────────────────────────────────────────

  async fn create_subscription(
    &self,
    topic_id: Uuid,
    subscriber_id: Uuid,
  ) -> Result<Subscription> {
    let subscription = Subscription {
      subscription_id: Uuid::new_v4(),
      topic_id,
      subscriber_id,
      created_at: Utc::now(),
    };

    let sub_id_str   = encode_uuid(subscription.subscription_id);
    let topic_id_str = encode_uuid(topic_id);
    let user_id_str  = encode_uuid(subscriber_id);
    let at_str       = encode_dt(subscription.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subscriptions (subscription_id, topic_id, subscriber_id, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![sub_id_str, topic_id_str, user_id_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(subscription)
  }

  async fn delete_subscriptions(
    &self,
    topic_id: Uuid,
    subscriber_id: Uuid,
  ) -> Result<u64> {
    let topic_id_str = encode_uuid(topic_id);
    let user_id_str  = encode_uuid(subscriber_id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM subscriptions WHERE topic_id = ?1 AND subscriber_id = ?2",
          rusqlite::params![topic_id_str, user_id_str],
        )?)
      })
      .await?;
    Ok(removed as u64)
  }

  async fn subscription_for(
    &self,
    topic_id: Uuid,
    subscriber_id: Uuid,
  ) -> Result<Option<Subscription>> {
    let topic_id_str = encode_uuid(topic_id);
    let user_id_str  = encode_uuid(subscriber_id);

    let raw: Option<RawSubscription> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT subscription_id, topic_id, subscriber_id, created_at
             FROM subscriptions
             WHERE topic_id = ?1 AND subscriber_id = ?2",
            rusqlite::params![topic_id_str, user_id_str],
            |row| {
              Ok(RawSubscription {
                subscription_id: row.get(0)?,
                topic_id:        row.get(1)?,
                subscriber_id:   row.get(2)?,
                created_at:      row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSubscription::into_subscription).transpose()
  }

  // ── Views ─────────────────────────────────────────────────────────────

  async fn record_view(&self, topic_id: Uuid, user_id: Uuid) -> Result<View> {
    let view_id_str  = encode_uuid(Uuid::new_v4());
    let topic_id_str = encode_uuid(topic_id);
    let user_id_str  = encode_uuid(user_id);
    let at_str       = encode_dt(Utc::now());

    // Single-statement upsert; two racing calls both land as increments.
    let raw: RawView = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO views (view_id, topic_id, user_id, count, last_viewed_at)
           VALUES (?1, ?2, ?3, 1, ?4)
           ON CONFLICT (topic_id, user_id)
           DO UPDATE SET count = count + 1, last_viewed_at = excluded.last_viewed_at",
          rusqlite::params![view_id_str, topic_id_str, user_id_str, at_str],
        )?;
        let raw = conn.query_row(
          "SELECT view_id, topic_id, user_id, count, last_viewed_at
           FROM views WHERE topic_id = ?1 AND user_id = ?2",
          rusqlite::params![topic_id_str, user_id_str],
          |row| {
            Ok(RawView {
              view_id:        row.get(0)?,
              topic_id:       row.get(1)?,
              user_id:        row.get(2)?,
              count:          row.get(3)?,
              last_viewed_at: row.get(4)?,
            })
          },
        )?;
        Ok(raw)
      })
      .await?;

    raw.into_view()
  }

  async fn view_for(&self, topic_id: Uuid, user_id: Uuid) -> Result<Option<View>> {
    let topic_id_str = encode_uuid(topic_id);
    let user_id_str  = encode_uuid(user_id);

    let raw: Option<RawView> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT view_id, topic_id, user_id, count, last_viewed_at
             FROM views WHERE topic_id = ?1 AND user_id = ?2",
            rusqlite::params![topic_id_str, user_id_str],
            |row| {
              Ok(RawView {
                view_id:        row.get(0)?,
                topic_id:       row.get(1)?,
                user_id:        row.get(2)?,
                count:          row.get(3)?,
                last_viewed_at: row.get(4)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawView::into_view).transpose()
  }
}

// ─── UserDirectory impl ──────────────────────────────────────────────────────

impl UserDirectory for SqliteStore {
  type Error = Error;

  async fn approval_status(&self, user_id: Uuid) -> Result<ApprovalStatus> {
    let id_str = encode_uuid(user_id);

    let state: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT state FROM users WHERE user_id = ?1",
            rusqlite::params![id_str],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    // Users the directory has never seen read as pending.
    match state {
      Some(s) => decode_approval(&s),
      None => Ok(ApprovalStatus::Pending),
    }
  }

  async fn set_approval_status(
    &self,
    user_id: Uuid,
    status: ApprovalStatus,
  ) -> Result<()> {
    let id_str    = encode_uuid(user_id);
    let state_str = encode_approval(status).to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, state) VALUES (?1, ?2)
           ON CONFLICT (user_id) DO UPDATE SET state = excluded.state",
          rusqlite::params![id_str, state_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
