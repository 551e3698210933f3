/// Gate checked once per subscription attempt.
pub trait NotificationPermissions: Send + Sync + std::fmt::Debug {
    /// Whether the host currently has permission to show notifications.
    fn notifications_enabled(&self) -> bool;
}

/// Default gate for hosts without a notification permission model.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAllowed;

impl NotificationPermissions for AlwaysAllowed {
    fn notifications_enabled(&self) -> bool {
        true
    }
}
