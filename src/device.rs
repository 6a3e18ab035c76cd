//! Device-level types exchanged with the service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::macros::wire_code_enum;

/// Device id meaning "any/default device".
pub fn default_device_uid() -> String {
    Uuid::nil().to_string()
}

wire_code_enum! {
    /// Lifetime of a device identifier.
    pub enum DeviceUidType {
        /// Survives reconnects.
        Persistent = 0,
        /// Changes each time the device is plugged in.
        Volatile = 1,
    } else Other
}

wire_code_enum! {
    /// How a finger is presented to the reader.
    pub enum DeviceModality {
        Unknown = 0,
        Swipe = 1,
        Area = 2,
        AreaMultifinger = 3,
    } else Other
}

wire_code_enum! {
    /// Sensor technology of the reader.
    pub enum DeviceTechnology {
        Unknown = 0,
        Optical = 1,
        Capacitive = 2,
        Thermal = 3,
        Pressure = 4,
    } else Other
}

wire_code_enum! {
    /// Format in which samples are delivered.
    pub enum SampleFormat {
        Raw = 1,
        Intermediate = 2,
        Compressed = 3,
        PngImage = 5,
    } else Other
}

wire_code_enum! {
    /// Quality verdict reported for a capture attempt.
    pub enum QualityCode {
        Good = 0,
        NoImage = 1,
        TooLight = 2,
        TooDark = 3,
        TooNoisy = 4,
        LowContrast = 5,
        NotEnoughFeatures = 6,
        NotCentered = 7,
        NotAFinger = 8,
        TooHigh = 9,
        TooLow = 10,
        TooLeft = 11,
        TooRight = 12,
        TooStrange = 13,
        TooFast = 14,
        TooSkewed = 15,
        TooShort = 16,
        TooSlow = 17,
        ReverseMotion = 18,
        PressureTooHard = 19,
        PressureTooLight = 20,
        WetFinger = 21,
        FakeFinger = 22,
        TooSmall = 23,
        RotatedTooMuch = 24,
    } else Other
}

/// Description of a single reader as returned by GetDeviceInfo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(rename = "DeviceID")]
    pub id: String,
    #[serde(rename = "eUidType")]
    pub uid_type: DeviceUidType,
    #[serde(rename = "eDeviceModality")]
    pub modality: DeviceModality,
    #[serde(rename = "eDeviceTech")]
    pub technology: DeviceTechnology,
}
