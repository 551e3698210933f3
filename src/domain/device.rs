use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Platform tag written into every registration produced by this crate.
pub const DEVICE_TYPE: &str = "Desktop";

/// Placeholder used when the device name cannot be determined.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown";

pub const USER_ID_FIELD: &str = "userId";
pub const DEVICES_FIELD: &str = "devices";

/// One device's registration inside a user's document.
///
/// The token is optional: a revoked token is stored as an explicit null so
/// senders can tell "device known, currently unreachable" from "device gone".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub device_id: String,
    pub fcm_token: Option<String>,
    pub name: String,
    pub os: String,
    #[serde(rename = "type")]
    pub device_type: String,
}

/// The per-user registration document: all known devices keyed by device id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDevices {
    pub user_id: String,
    pub devices: HashMap<String, DeviceRecord>,
}

impl UserDevices {
    /// Builds the single-device payload used for merge writes.
    #[must_use]
    pub fn single(user_id: impl Into<String>, device: DeviceRecord) -> Self {
        let devices = HashMap::from([(device.device_id.clone(), device)]);
        Self { user_id: user_id.into(), devices }
    }
}
