/// Wire protocol spoken with the local device service
///
/// This module defines the outer envelope, the inner response, notification
/// and command records, the integer codes they carry, and the JSON payloads
/// nested inside them.
mod codes;
mod message;
mod payload;

pub use codes::{MessageType, Method, NotificationKind};
pub use message::{Command, Envelope, Notification, Payload, Response};
pub use payload::{
    //
    AcquisitionParams,
    CompletedPayload,
    DeviceParams,
    EnumerateDevicesPayload,
    ErrorPayload,
    QualityPayload,
};
