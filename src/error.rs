//! Typed error kinds (spec §7). Every layer propagates one of these variants;
//! nothing downcasts a boxed `dyn Error` across a module boundary.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// A single broker-reported protocol error, carrying the classification bits
/// higher layers need to decide whether to retry, invalidate metadata, or
/// rejoin a consumer group.
#[derive(Debug, Clone, Error)]
#[error("protocol error on api {api_id} (code {api_code}): {message}")]
pub struct ProtocolError {
    pub api_id: i16,
    pub api_code: i16,
    pub message: String,
    pub can_retry: bool,
    pub has_stale_metadata: bool,
    pub needs_rejoin: bool,
    pub rebalance_in_progress: bool,
    pub unknown_member_id: bool,
    pub member_id: Option<String>,
}

impl ProtocolError {
    pub fn from_code(api_id: i16, code: i16) -> Self {
        let (message, can_retry, has_stale_metadata, needs_rejoin, rebalance_in_progress, unknown_member_id) =
            classify(code);
        Self {
            api_id,
            api_code: code,
            message: message.to_string(),
            can_retry,
            has_stale_metadata,
            needs_rejoin,
            rebalance_in_progress,
            unknown_member_id,
            member_id: None,
        }
    }
}

/// Maps a Kafka protocol error code to `(message, can_retry, has_stale_metadata,
/// needs_rejoin, rebalance_in_progress, unknown_member_id)`. Only the codes
/// this client needs to branch on are named individually; everything else is
/// non-retriable by default.
fn classify(code: i16) -> (&'static str, bool, bool, bool, bool, bool) {
    match code {
        0 => ("no error", false, false, false, false, false),
        3 => ("UNKNOWN_TOPIC_OR_PARTITION", true, true, false, false, false),
        5 => ("LEADER_NOT_AVAILABLE", true, true, false, false, false),
        6 => ("NOT_LEADER_OR_FOLLOWER", true, true, false, false, false),
        7 => ("REQUEST_TIMED_OUT", true, false, false, false, false),
        15 => ("COORDINATOR_NOT_AVAILABLE", true, false, false, false, false),
        16 => ("NOT_COORDINATOR", true, false, false, false, false),
        22 => ("ILLEGAL_GENERATION", false, false, true, false, false),
        25 => ("UNKNOWN_MEMBER_ID", false, false, true, false, true),
        27 => ("REBALANCE_IN_PROGRESS", false, false, true, true, false),
        35 => ("UNSUPPORTED_VERSION", false, false, false, false, false),
        41 => ("NOT_CONTROLLER", true, false, false, false, false),
        45 => ("PRODUCER_FENCED", false, false, false, false, false),
        46 => ("DUPLICATE_SEQUENCE_NUMBER", false, false, false, false, false),
        47 => ("INVALID_PRODUCER_EPOCH", false, false, false, false, false),
        _ => ("unclassified broker error", false, false, false, false, false),
    }
}

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("network error: {message} (closed={closed})")]
    Network { message: String, closed: bool },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("response carried {0} partition/topic-level error(s)")]
    Response(Vec<ProtocolError>),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("unexpected correlation id: expected one of the pending requests, got {0}")]
    UnexpectedCorrelationId(i32),

    #[error("write buffer left in an inconsistent state: {0}")]
    UnfinishedWriteBuffer(String),

    #[error("unsupported compression codec: {0}")]
    UnsupportedCompression(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("invalid argument: {0}")]
    User(String),

    #[error("{message} ({} error(s))", .errors.len())]
    Multiple {
        message: String,
        errors: Vec<Error>,
    },

    #[error("ran out of bytes reading {0}")]
    OutOfBounds(&'static str),
}

impl Error {
    pub fn network(message: impl Into<String>) -> Self {
        Error::Network { message: message.into(), closed: false }
    }

    pub fn network_closed() -> Self {
        Error::Network { message: "connection closed".to_string(), closed: true }
    }

    pub fn multiple(message: impl Into<String>, errors: Vec<Error>) -> Self {
        Error::Multiple { message: message.into(), errors }
    }

    /// Recursively searches this error (and, for `Multiple`, every nested
    /// error) for one whose named boolean property is set.
    pub fn has_any(&self, property: ErrorProperty) -> bool {
        match self {
            Error::Protocol(p) => property.test(p),
            Error::Multiple { errors, .. } => errors.iter().any(|e| e.has_any(property)),
            Error::Network { .. } => matches!(property, ErrorProperty::CanRetry),
            _ => false,
        }
    }

    /// Whether the retry engine should consider this error retriable:
    /// `code == NETWORK` or `canRetry == true` (spec §4.6.3).
    pub fn is_retriable(&self) -> bool {
        match self {
            Error::Network { .. } => true,
            Error::Protocol(p) => p.can_retry,
            Error::Multiple { errors, .. } => errors.iter().any(|e| e.is_retriable()),
            _ => false,
        }
    }

    pub fn has_stale_metadata(&self) -> bool {
        self.has_any(ErrorProperty::HasStaleMetadata)
    }

    pub fn needs_rejoin(&self) -> bool {
        self.has_any(ErrorProperty::NeedsRejoin)
    }

    pub fn unknown_member_id(&self) -> bool {
        self.has_any(ErrorProperty::UnknownMemberId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorProperty {
    CanRetry,
    HasStaleMetadata,
    NeedsRejoin,
    RebalanceInProgress,
    UnknownMemberId,
}

impl ErrorProperty {
    fn test(self, p: &ProtocolError) -> bool {
        match self {
            ErrorProperty::CanRetry => p.can_retry,
            ErrorProperty::HasStaleMetadata => p.has_stale_metadata,
            ErrorProperty::NeedsRejoin => p.needs_rejoin,
            ErrorProperty::RebalanceInProgress => p.rebalance_in_progress,
            ErrorProperty::UnknownMemberId => p.unknown_member_id,
        }
    }
}
