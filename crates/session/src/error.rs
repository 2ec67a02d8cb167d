use thiserror::Error;

/// Failures surfaced out of a [`crate::actor::SessionActor`] loop itself
/// (as opposed to a retrieval failure, which becomes an `error` outbound
/// message rather than terminating the session).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("malformed inbound message: {0}")]
    MalformedMessage(String),

    #[error("session closed")]
    Closed,
}
