use thiserror::Error;

use crate::protocol::Method;

/// Errors that can occur while talking to the device service
#[derive(Error, Debug)]
pub enum Error {
    /// The channel could not be opened, or dropped while requests were pending
    #[error("Communication failure.")]
    CommunicationFailure,

    /// The service answered with a result code outside the success range
    ///
    /// `code` is the raw result reinterpreted as an unsigned 32-bit value,
    /// which is how HRESULT-style failures are usually quoted.
    #[error("{method}: {code:x}")]
    MethodFailed { method: Method, code: u32 },

    /// Request timed out waiting for a response
    #[error("request timed out")]
    Timeout,

    /// JSON serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A frame or payload was not valid base64url
    #[error("base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    /// A decoded frame was not valid UTF-8
    #[error("invalid utf-8 payload: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// A message arrived without the payload its kind requires
    #[error("{0} carried no payload")]
    MissingPayload(String),

    /// An integer code on the wire has no known meaning
    #[error("unknown {kind} code: {code}")]
    UnknownCode { kind: &'static str, code: i64 },

    /// An event name does not match any event kind
    #[error("unknown event name: {0}")]
    UnknownEvent(String),

    /// The underlying channel refused an operation
    #[error("channel error: {0}")]
    Channel(String),

    /// The client went away before the request was settled
    #[error("request dropped before a response arrived")]
    RequestDropped,
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;
