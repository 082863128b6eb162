use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Which response was being decoded when a [RequestError::MalformedResponse] occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Info,
    Rules,
    Players,
    Ping,
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResponseKind::Info => "info",
            ResponseKind::Rules => "rules",
            ResponseKind::Players => "players",
            ResponseKind::Ping => "ping",
        };
        f.write_str(name)
    }
}

/// Various errors
#[derive(Error, Debug)]
pub enum RequestError {
    /// Missing host, out of range port or a zero timeout.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// The request could not be dispatched (resolution, bind or send failure).
    #[error("send failed '{0}'")]
    SendFailed(#[source] std::io::Error),
    /// No reply arrived in time.
    #[error("host unavailable, no reply within {0:?}")]
    Timeout(Duration),
    /// The reply was shorter than the packet header.
    #[error("reply of {len} bytes is shorter than the packet header")]
    TruncatedHeader { len: usize },
    /// The payload ended early or a field could not be parsed.
    #[error("malformed {kind} response: {reason}")]
    MalformedResponse { kind: ResponseKind, reason: String },
    /// Errors from the socket while waiting for the reply.
    #[error("receive error '{0}'")]
    Receive(#[source] std::io::Error),
}

impl RequestError {
    pub(crate) fn malformed<R: ToString>(kind: ResponseKind, reason: R) -> Self {
        RequestError::MalformedResponse {
            kind,
            reason: reason.to_string(),
        }
    }
}

/// A type alias to handle Results with RequestError.
pub type Result<T, V = RequestError> = std::result::Result<T, V>;
