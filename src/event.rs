//! Typed events delivered to subscribers.
//!
//! Every notification from the service, plus transport failure, surfaces as
//! one [`Event`]. Subscribers register per [`EventKind`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::codec::decode;
use crate::device::{QualityCode, SampleFormat};
use crate::protocol::{CompletedPayload, ErrorPayload, Notification, NotificationKind, QualityPayload};
use crate::{Error, Result};

/// Something that happened on a device or on the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    DeviceConnected {
        device_uid: String,
    },
    DeviceDisconnected {
        device_uid: String,
    },
    SamplesAcquired {
        device_uid: String,
        sample_format: SampleFormat,
        /// JSON array of base64url-encoded samples.
        samples: String,
    },
    QualityReported {
        device_uid: String,
        quality: QualityCode,
    },
    ErrorOccurred {
        device_uid: String,
        error: i64,
    },
    AcquisitionStarted {
        device_uid: String,
    },
    AcquisitionStopped {
        device_uid: String,
    },
    CommunicationFailed,
}

/// Discriminant of [`Event`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DeviceConnected,
    DeviceDisconnected,
    SamplesAcquired,
    QualityReported,
    ErrorOccurred,
    AcquisitionStarted,
    AcquisitionStopped,
    CommunicationFailed,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::DeviceConnected,
        EventKind::DeviceDisconnected,
        EventKind::SamplesAcquired,
        EventKind::QualityReported,
        EventKind::ErrorOccurred,
        EventKind::AcquisitionStarted,
        EventKind::AcquisitionStopped,
        EventKind::CommunicationFailed,
    ];

    /// Public event name.
    pub fn name(self) -> &'static str {
        // ---
        match self {
            EventKind::DeviceConnected => "DeviceConnected",
            EventKind::DeviceDisconnected => "DeviceDisconnected",
            EventKind::SamplesAcquired => "SamplesAcquired",
            EventKind::QualityReported => "QualityReported",
            EventKind::ErrorOccurred => "ErrorOccurred",
            EventKind::AcquisitionStarted => "AcquisitionStarted",
            EventKind::AcquisitionStopped => "AcquisitionStopped",
            EventKind::CommunicationFailed => "CommunicationFailed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| Error::UnknownEvent(name.to_string()))
    }
}

impl Event {
    // ---
    pub fn kind(&self) -> EventKind {
        // ---
        match self {
            Event::DeviceConnected { .. } => EventKind::DeviceConnected,
            Event::DeviceDisconnected { .. } => EventKind::DeviceDisconnected,
            Event::SamplesAcquired { .. } => EventKind::SamplesAcquired,
            Event::QualityReported { .. } => EventKind::QualityReported,
            Event::ErrorOccurred { .. } => EventKind::ErrorOccurred,
            Event::AcquisitionStarted { .. } => EventKind::AcquisitionStarted,
            Event::AcquisitionStopped { .. } => EventKind::AcquisitionStopped,
            Event::CommunicationFailed => EventKind::CommunicationFailed,
        }
    }

    /// Device the event refers to; `None` only for `CommunicationFailed`.
    pub fn device_uid(&self) -> Option<&str> {
        // ---
        match self {
            Event::DeviceConnected { device_uid }
            | Event::DeviceDisconnected { device_uid }
            | Event::SamplesAcquired { device_uid, .. }
            | Event::QualityReported { device_uid, .. }
            | Event::ErrorOccurred { device_uid, .. }
            | Event::AcquisitionStarted { device_uid }
            | Event::AcquisitionStopped { device_uid } => Some(device_uid),
            Event::CommunicationFailed => None,
        }
    }

    /// Split the `samples` field of `SamplesAcquired` into individual
    /// base64url samples. Any other event yields an empty list.
    pub fn sample_list(&self) -> Result<Vec<String>> {
        // ---
        match self {
            Event::SamplesAcquired { samples, .. } => Ok(serde_json::from_str(samples)?),
            _ => Ok(Vec::new()),
        }
    }

    /// Map a notification onto its event.
    ///
    /// Returns `Ok(None)` for event codes this client does not know about.
    pub fn from_notification(notification: &Notification) -> Result<Option<Event>> {
        // ---
        let kind = match NotificationKind::try_from(notification.event) {
            Ok(kind) => kind,
            Err(_) => return Ok(None),
        };

        let device_uid = notification.device.clone();

        let event = match kind {
            NotificationKind::Completed => {
                let completed: CompletedPayload = data_of(notification)?;
                Event::SamplesAcquired {
                    device_uid,
                    sample_format: completed.sample_format,
                    samples: completed.samples,
                }
            }
            NotificationKind::Connected => Event::DeviceConnected { device_uid },
            NotificationKind::Disconnected => Event::DeviceDisconnected { device_uid },
            NotificationKind::Error => {
                let error: ErrorPayload = data_of(notification)?;
                Event::ErrorOccurred {
                    device_uid,
                    error: error.error,
                }
            }
            NotificationKind::Quality => {
                let quality: QualityPayload = data_of(notification)?;
                Event::QualityReported {
                    device_uid,
                    quality: quality.quality,
                }
            }
            NotificationKind::Started => Event::AcquisitionStarted { device_uid },
            NotificationKind::Stopped => Event::AcquisitionStopped { device_uid },
        };

        Ok(Some(event))
    }
}

fn data_of<T: serde::de::DeserializeOwned>(notification: &Notification) -> Result<T> {
    // ---
    let encoded = notification
        .data
        .as_deref()
        .ok_or_else(|| Error::MissingPayload(format!("notification {}", notification.event)))?;
    Ok(serde_json::from_str(&decode(encoded)?)?)
}

type HandlerFn = dyn Fn(&Event) + Send + Sync;

/// Cloneable event callback.
///
/// Two handles compare equal when they wrap the same closure, which is what
/// `off` uses to find registrations to remove.
#[derive(Clone)]
pub struct EventHandler(Arc<HandlerFn>);

impl EventHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub(crate) fn call(&self, event: &Event) {
        (self.0)(event)
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }
}

impl Eq for EventHandler {}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}
