use crate::domain::device::UNKNOWN_DEVICE_NAME;
use crate::services::device_info::DeviceDescriber;

/// Host-configured device description with best-effort defaults.
///
/// The device id must be stable across restarts; everything else is
/// cosmetic and may be overridden by the host.
#[derive(Debug, Clone)]
pub struct StaticDeviceInfo {
    device_id: String,
    name: String,
    os: String,
}

impl StaticDeviceInfo {
    #[must_use]
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            name: UNKNOWN_DEVICE_NAME.to_string(),
            os: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = os.into();
        self
    }
}

impl DeviceDescriber for StaticDeviceInfo {
    fn device_id(&self) -> String {
        self.device_id.clone()
    }

    fn device_name(&self) -> String {
        self.name.clone()
    }

    fn os_label(&self) -> String {
        self.os.clone()
    }
}
