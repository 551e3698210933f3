/// Describes the physical device this process runs on.
pub trait DeviceDescriber: Send + Sync + std::fmt::Debug {
    /// Stable identifier for this device, used as the key in the `devices`
    /// map. Must survive restarts, or each run registers a new device.
    fn device_id(&self) -> String;

    /// Best-effort human-readable device name.
    fn device_name(&self) -> String;

    /// Platform label, e.g. OS name plus version.
    fn os_label(&self) -> String;
}
