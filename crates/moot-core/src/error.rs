//! Error types for `moot-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::topic::{ModerationState, TopicEvent};

#[derive(Debug, Error)]
pub enum Error {
  #[error("topic subject must not be empty")]
  EmptySubject,

  #[error("post body must not be empty")]
  EmptyPostBody,

  #[error("cannot {event} a topic in state {from}")]
  InvalidTransition {
    from:  ModerationState,
    event: TopicEvent,
  },

  #[error("topic {0} is locked")]
  TopicLocked(Uuid),

  #[error("topic not found: {0}")]
  TopicNotFound(Uuid),

  #[error("topic {0} has no posts")]
  FirstPostNotFound(Uuid),

  /// A storage or directory port call failed. Moot performs no retries;
  /// retry policy belongs to the caller or the port implementation.
  #[error("persistence error: {0}")]
  Persistence(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
  /// Wrap a port error into [`Error::Persistence`].
  pub fn persistence<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Persistence(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
