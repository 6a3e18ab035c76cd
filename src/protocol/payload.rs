//! Inner JSON records carried inside command parameters and response or
//! notification `Data` fields.

use serde::{Deserialize, Serialize};

use crate::device::{QualityCode, SampleFormat};

/// Parameters of GetDeviceInfo and StopAcquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceParams {
    #[serde(rename = "DeviceID")]
    pub device_id: String,
}

/// Parameters of StartAcquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionParams {
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    #[serde(rename = "SampleType")]
    pub sample_type: SampleFormat,
}

/// Successful EnumerateDevices payload.
///
/// `device_ids` is itself a JSON-encoded array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerateDevicesPayload {
    #[serde(rename = "DeviceCount")]
    pub device_count: u32,
    #[serde(rename = "DeviceIDs")]
    pub device_ids: String,
}

impl EnumerateDevicesPayload {
    /// Unwrap the nested device-id array.
    pub fn device_ids(&self) -> crate::Result<Vec<String>> {
        Ok(serde_json::from_str(&self.device_ids)?)
    }
}

/// Payload of a Completed notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPayload {
    #[serde(rename = "SampleFormat")]
    pub sample_format: SampleFormat,
    #[serde(rename = "Samples")]
    pub samples: String,
}

/// Payload of an Error notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(rename = "uError")]
    pub error: i64,
}

/// Payload of a Quality notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityPayload {
    #[serde(rename = "Quality")]
    pub quality: QualityCode,
}
