use serde::{Deserialize, Serialize};

use crate::codec::{decode, to_base64_url};
use crate::protocol::{MessageType, Method};
use crate::{Error, Result};

/// Highest result code that still means success.
const SUCCESS_MAX: i64 = i32::MAX as i64;

/// Outer wire message.
///
/// On the channel the whole JSON object is itself base64url-encoded; `data`
/// holds the base64url-encoded inner [`Response`] or [`Notification`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "Type")]
    pub message_type: MessageType,
    #[serde(rename = "Data")]
    pub data: String,
}

/// Decoded body of an [`Envelope`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Response(Response),
    Notification(Notification),
}

impl Envelope {
    // ---
    /// Wrap a response for transmission.
    pub fn response(response: &Response) -> Result<Self> {
        // ---
        Ok(Self {
            message_type: MessageType::Response,
            data: to_base64_url(&serde_json::to_string(response)?),
        })
    }

    /// Wrap a notification for transmission.
    pub fn notification(notification: &Notification) -> Result<Self> {
        // ---
        Ok(Self {
            message_type: MessageType::Notification,
            data: to_base64_url(&serde_json::to_string(notification)?),
        })
    }

    /// Render the envelope as a channel frame.
    pub fn encode(&self) -> Result<String> {
        Ok(to_base64_url(&serde_json::to_string(self)?))
    }

    /// Parse a channel frame.
    pub fn decode(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(&decode(frame)?)?)
    }

    /// Decode the inner record according to `message_type`.
    pub fn payload(&self) -> Result<Payload> {
        // ---
        let inner = decode(&self.data)?;
        match self.message_type {
            MessageType::Response => Ok(Payload::Response(serde_json::from_str(&inner)?)),
            MessageType::Notification => Ok(Payload::Notification(serde_json::from_str(&inner)?)),
        }
    }
}

/// Answer to a previously sent [`Command`].
///
/// `method` and `result` stay raw integers here: unknown methods are
/// dropped by the client and `result` may arrive signed or unsigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "Method")]
    pub method: i64,
    #[serde(rename = "Result")]
    pub result: i64,
    #[serde(rename = "Data", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl Response {
    /// Build a response, encoding `data` (plain JSON) as base64url.
    pub fn new(method: Method, result: i64, data: Option<&str>) -> Self {
        // ---
        Self {
            method: method.code(),
            result,
            data: data.map(to_base64_url),
        }
    }

    /// Whether `result` is in the success range `[0, i32::MAX]`.
    pub fn is_success(&self) -> bool {
        (0..=SUCCESS_MAX).contains(&self.result)
    }

    /// Settle the response for `method`: the still-encoded payload on
    /// success, [`Error::MethodFailed`] otherwise.
    pub fn outcome(&self, method: Method) -> Result<Option<String>> {
        // ---
        if self.is_success() {
            Ok(self.data.clone())
        } else {
            Err(Error::MethodFailed {
                method,
                code: self.result as u32,
            })
        }
    }
}

/// Unsolicited message about a device or an acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "Event")]
    pub event: i64,
    #[serde(rename = "Device")]
    pub device: String,
    #[serde(rename = "Data", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl Notification {
    /// Build a notification, encoding `data` (plain JSON) as base64url.
    pub fn new(
        event: crate::protocol::NotificationKind,
        device: impl Into<String>,
        data: Option<&str>,
    ) -> Self {
        // ---
        Self {
            event: event.code(),
            device: device.into(),
            data: data.map(to_base64_url),
        }
    }
}

/// Request sent to the service.
///
/// Immutable once built; `parameters` is base64url-encoded JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "Method")]
    pub method: Method,
    #[serde(rename = "Parameters", default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
}

impl Command {
    // ---
    /// A command without parameters.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            parameters: None,
        }
    }

    /// A command whose parameters are JSON-then-base64url encoded.
    pub fn with_parameters<P: Serialize>(method: Method, parameters: &P) -> Result<Self> {
        // ---
        Ok(Self {
            method,
            parameters: Some(to_base64_url(&serde_json::to_string(parameters)?)),
        })
    }

    /// Render the command as a channel frame.
    pub fn encode(&self) -> Result<String> {
        Ok(to_base64_url(&serde_json::to_string(self)?))
    }

    /// Parse a channel frame produced by [`encode`](Self::encode).
    pub fn decode(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(&decode(frame)?)?)
    }

    /// Decode the parameters into a typed record.
    pub fn parameters<P: serde::de::DeserializeOwned>(&self) -> Result<Option<P>> {
        // ---
        self.parameters
            .as_deref()
            .map(|encoded| Ok(serde_json::from_str(&decode(encoded)?)?))
            .transpose()
    }
}
