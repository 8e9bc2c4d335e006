use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SyncError {
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    Oversize { len: usize, max: usize },

    #[error("unknown message kind tag {tag}")]
    UnknownKind { tag: u8 },

    #[error("data ticket '{id}' is not registered")]
    UnknownTicket { id: String },

    #[error("data ticket '{id}' already registered as {registered}, not {requested}")]
    TicketConflict {
        id: String,
        registered: &'static str,
        requested: &'static str,
    },

    #[error("{count} trailing bytes after message body")]
    TrailingBytes { count: usize },

    #[error("malformed frame: {reason}")]
    Malformed { reason: String },

    #[error("payload for ticket '{ticket}' is invalid: {reason}")]
    Payload { ticket: String, reason: String },

    #[error("invalid sync config: {reason}")]
    Config { reason: String },
}
