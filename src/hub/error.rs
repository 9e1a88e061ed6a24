use crate::protocol::MessageId;

/// Why an event turned into a no-op. None of these close the connection.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HubError {
    #[error("Username already taken")]
    IdentityConflict(String),
    #[error("{0} is not connected")]
    UnresolvedTarget(String),
    #[error("no message {0} in that room")]
    UnknownMessage(MessageId),
    #[error("connection has not joined yet")]
    NotJoined,
    #[error("connection is gone")]
    Detached,
}
