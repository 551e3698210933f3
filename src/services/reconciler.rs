use crate::domain::user::AuthUser;

/// External happenings the synchronizer reacts to, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SyncEvent {
    SessionChanged(Option<AuthUser>),
    TokenFetched(String),
    TokenRotated(Option<String>),
}

/// A registration write the reconciler decided on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WriteDevice {
    pub(crate) user_id: String,
    pub(crate) token: Option<String>,
}

/// Cached session/token pair reconciled against the store. The rule
/// throughout: a write happens only once both halves are known, and a write
/// targets the user cached at the time the event lands.
#[derive(Debug, Default)]
pub(crate) struct SyncState {
    pub(crate) subscribed: bool,
    pub(crate) user: Option<AuthUser>,
    pub(crate) token: Option<String>,
}

impl SyncState {
    /// Marks the store subscribed and seeds the cached user.
    pub(crate) fn begin(&mut self, user: Option<AuthUser>) {
        self.subscribed = true;
        self.user = user;
    }

    /// Clears everything; events are ignored until the next `begin`.
    pub(crate) fn reset(&mut self) {
        self.subscribed = false;
        self.user = None;
        self.token = None;
    }

    /// Clears the cached user and returns the uid whose registration should
    /// be deleted, if both halves were cached. The user is cleared even when
    /// no delete is due, so a late token cannot resurrect the registration.
    pub(crate) fn take_sign_out(&mut self) -> Option<String> {
        let due = match (&self.user, &self.token) {
            (Some(user), Some(_)) => Some(user.uid.clone()),
            _ => None,
        };
        self.user = None;
        due
    }

    /// Folds one event into the cached state and reports the write it
    /// implies, if any.
    pub(crate) fn apply(&mut self, event: SyncEvent) -> Option<WriteDevice> {
        if !self.subscribed {
            return None;
        }
        match event {
            SyncEvent::SessionChanged(Some(user)) => {
                if self.user.is_some() {
                    // Already tracking a user; a second sign-in event for
                    // this session is ignored until sign_out.
                    return None;
                }
                let write = self
                    .token
                    .as_ref()
                    .map(|token| WriteDevice { user_id: user.uid.clone(), token: Some(token.clone()) });
                self.user = Some(user);
                write
            }
            SyncEvent::SessionChanged(None) => {
                if self.user.take().is_some() {
                    tracing::warn!(
                        "Session ended while subscribed; call sign_out on the device store before signing out the user"
                    );
                }
                None
            }
            SyncEvent::TokenFetched(token) => {
                self.token = Some(token);
                self.user
                    .as_ref()
                    .map(|user| WriteDevice { user_id: user.uid.clone(), token: self.token.clone() })
            }
            SyncEvent::TokenRotated(token) => {
                let Some(user) = &self.user else {
                    self.token = token;
                    return None;
                };
                if token == self.token {
                    return None;
                }
                let write = WriteDevice { user_id: user.uid.clone(), token: token.clone() };
                self.token = token;
                Some(write)
            }
        }
    }
}
