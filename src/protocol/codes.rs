use std::fmt;

use crate::macros::wire_code_enum;

wire_code_enum! {
    /// Protocol operation carried by both commands and responses.
    ///
    /// Responses are correlated to requests by method alone, so two
    /// in-flight calls of the same method are matched in submission order.
    pub enum Method {
        EnumerateDevices = 1,
        GetDeviceInfo = 2,
        StartAcquisition = 3,
        StopAcquisition = 4,
    }
}

impl Method {
    /// Name used in error messages.
    pub fn name(self) -> &'static str {
        // ---
        match self {
            Method::EnumerateDevices => "EnumerateDevices",
            Method::GetDeviceInfo => "GetDeviceInfo",
            Method::StartAcquisition => "StartAcquisition",
            Method::StopAcquisition => "StopAcquisition",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

wire_code_enum! {
    /// Kind of an unsolicited notification from the service.
    pub enum NotificationKind {
        /// Samples were captured.
        Completed = 0,
        Error = 1,
        Disconnected = 2,
        Connected = 3,
        Quality = 4,
        Stopped = 10,
        Started = 11,
    }
}

wire_code_enum! {
    /// Discriminates the two kinds of outer envelope.
    pub enum MessageType {
        Response = 0,
        Notification = 1,
    }
}
