use crate::services::tokens::TokenRotation;
use tokio::sync::broadcast;

const RELAY_CAPACITY: usize = 16;

/// Bridges the host's push transport into rotation announcements.
///
/// Call [`TokenRelay::publish`] from wherever the messaging layer learns
/// about a new registration token; every store built on this relay picks
/// the change up.
#[derive(Debug, Clone)]
pub struct TokenRelay {
    sender: broadcast::Sender<TokenRotation>,
}

impl TokenRelay {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(RELAY_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _rx) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Announces a rotation. `None` means the token was revoked.
    pub fn publish(&self, token: Option<String>) {
        // We ignore errors (e.g., if no one is listening yet).
        let _ = self.sender.send(TokenRotation { token });
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TokenRotation> {
        self.sender.subscribe()
    }
}

impl Default for TokenRelay {
    fn default() -> Self {
        Self::new()
    }
}
