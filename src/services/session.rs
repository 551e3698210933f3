use crate::domain::user::AuthUser;
use tokio::sync::watch;

/// Source of authentication state, typically backed by the host's
/// Firebase Auth integration.
pub trait SessionProvider: Send + Sync + std::fmt::Debug {
    /// Returns the user currently signed in, if any.
    fn current_user(&self) -> Option<AuthUser>;

    /// Returns a receiver that tracks sign-in state. `None` means signed out.
    /// Dropping the receiver detaches the listener.
    fn watch_sessions(&self) -> watch::Receiver<Option<AuthUser>>;
}
