use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

/// Carried on the rotation channel. `None` means the platform revoked the
/// token without issuing a replacement yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRotation {
    pub token: Option<String>,
}

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token service unavailable: {0}")]
    Unavailable(String),
    #[error("External service error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Issues FCM registration tokens and announces rotations.
#[async_trait]
pub trait TokenIssuer: Send + Sync + std::fmt::Debug {
    /// Requests the current registration token for this device.
    ///
    /// # Errors
    /// Returns `TokenError` if no token can be obtained right now. The
    /// synchronizer logs the failure and waits for a rotation instead.
    async fn request_token(&self) -> Result<String, TokenError>;

    /// Returns a receiver for token rotation announcements.
    fn subscribe_rotations(&self) -> broadcast::Receiver<TokenRotation>;
}
