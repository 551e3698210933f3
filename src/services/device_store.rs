use crate::config::DeviceStoreConfig;
use crate::domain::device::{DEVICE_TYPE, DEVICES_FIELD, DeviceRecord, UserDevices};
use crate::domain::user::AuthUser;
use crate::error::{DeviceStoreError, Result};
use crate::services::device_info::DeviceDescriber;
use crate::services::documents::{DocumentPath, DocumentStore, FieldPath};
use crate::services::permissions::{AlwaysAllowed, NotificationPermissions};
use crate::services::reconciler::{SyncEvent, SyncState, WriteDevice};
use crate::services::session::SessionProvider;
use crate::services::tokens::TokenIssuer;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::Instrument;

#[derive(Debug)]
struct StoreInner {
    config: DeviceStoreConfig,
    sessions: Arc<dyn SessionProvider>,
    tokens: Arc<dyn TokenIssuer>,
    documents: Arc<dyn DocumentStore>,
    permissions: Arc<dyn NotificationPermissions>,
    device: Arc<dyn DeviceDescriber>,
    state: Mutex<SyncState>,
    session_listener: Mutex<Option<AbortHandle>>,
}

impl StoreInner {
    fn state(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn session_listener(&self) -> MutexGuard<'_, Option<AbortHandle>> {
        self.session_listener.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn document_path(&self, user_id: &str) -> DocumentPath {
        DocumentPath::new(&self.config.collection_path, user_id)
    }

    fn current_device(&self, token: Option<String>) -> DeviceRecord {
        DeviceRecord {
            device_id: self.device.device_id(),
            fcm_token: token,
            name: self.device.device_name(),
            os: self.device.os_label(),
            device_type: DEVICE_TYPE.to_string(),
        }
    }
}

/// Runs one event through the reconciler and spawns the write it calls for.
fn dispatch(inner: &Arc<StoreInner>, event: SyncEvent) {
    let write = inner.state().apply(event);
    if let Some(write) = write {
        spawn_write(inner, write);
    }
}

fn spawn_write(inner: &Arc<StoreInner>, write: WriteDevice) {
    let WriteDevice { user_id, token } = write;
    let record = inner.current_device(token);
    let path = inner.document_path(&user_id);
    let documents = Arc::clone(&inner.documents);
    let span = tracing::info_span!("write_device", user_id = %user_id);
    tokio::spawn(
        async move {
            let doc = UserDevices::single(user_id, record);
            if let Err(e) = documents.merge_write(&path, &doc).await {
                tracing::error!(error = %e, path = %path, "Failed to write device registration");
            }
        }
        .instrument(span),
    );
}

/// Forwards token rotation announcements into the reconciler for the whole
/// life of the store. Holds only a weak handle so dropping the last
/// `DeviceStore` clone stops the task.
fn spawn_rotation_intake(inner: &Arc<StoreInner>) {
    let mut rotations = inner.tokens.subscribe_rotations();
    let weak = Arc::downgrade(inner);
    tokio::spawn(
        async move {
            loop {
                match rotations.recv().await {
                    Ok(rotation) => {
                        let Some(inner) = weak.upgrade() else { break };
                        dispatch(&inner, SyncEvent::TokenRotated(rotation.token));
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(missed = n, "Token rotation receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
        .instrument(tracing::info_span!("token_rotation_intake")),
    );
}

fn spawn_token_fetch(inner: &Arc<StoreInner>) {
    let tokens = Arc::clone(&inner.tokens);
    let weak = Arc::downgrade(inner);
    tokio::spawn(
        async move {
            match tokens.request_token().await {
                Ok(token) => {
                    if let Some(inner) = weak.upgrade() {
                        dispatch(&inner, SyncEvent::TokenFetched(token));
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Failed to load FCM token"),
            }
        }
        .instrument(tracing::info_span!("token_fetch")),
    );
}

fn spawn_session_listener(inner: &Arc<StoreInner>, mut sessions: watch::Receiver<Option<AuthUser>>) -> AbortHandle {
    let weak = Arc::downgrade(inner);
    let listener = tokio::spawn(
        async move {
            while sessions.changed().await.is_ok() {
                let user = sessions.borrow_and_update().clone();
                let Some(inner) = weak.upgrade() else { break };
                dispatch(&inner, SyncEvent::SessionChanged(user));
            }
        }
        .instrument(tracing::info_span!("session_listener")),
    );
    listener.abort_handle()
}

/// Keeps this device's FCM registration for the currently signed-in user
/// synchronized in the document store.
///
/// Cheap to clone; all clones share one synchronizer.
#[derive(Clone, Debug)]
pub struct DeviceStore {
    inner: Arc<StoreInner>,
}

impl DeviceStore {
    #[must_use]
    pub fn builder(config: DeviceStoreConfig) -> DeviceStoreBuilder {
        DeviceStoreBuilder::new(config)
    }

    /// Starts synchronizing: snapshots the signed-in user, requests the
    /// current token in the background and registers a session listener.
    /// Calling this on an already subscribed store does nothing.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// Returns `DeviceStoreError::NotificationsDisabled` if the permission
    /// gate rejects the subscription. No listener is registered in that case.
    #[tracing::instrument(skip(self))]
    pub fn subscribe(&self) -> Result<()> {
        let mut state = self.inner.state();
        if state.subscribed {
            return Ok(());
        }
        if !self.inner.permissions.notifications_enabled() {
            return Err(DeviceStoreError::NotificationsDisabled);
        }

        // Watch before snapshotting, so a sign-in landing between the two
        // is still delivered through the listener.
        let sessions = self.inner.sessions.watch_sessions();
        state.begin(self.inner.sessions.current_user());

        spawn_token_fetch(&self.inner);
        let listener = spawn_session_listener(&self.inner, sessions);
        *self.inner.session_listener() = Some(listener);
        drop(state);

        tracing::debug!("Device store subscribed");
        Ok(())
    }

    /// Stops synchronizing and forgets all cached state. Writes already in
    /// flight are not cancelled. Stored registrations are left as they are;
    /// use [`DeviceStore::sign_out`] to remove this device first.
    #[tracing::instrument(skip(self))]
    pub fn unsubscribe(&self) {
        let mut state = self.inner.state();
        let was_subscribed = state.subscribed;
        state.reset();
        let listener = self.inner.session_listener().take();
        drop(state);

        if let Some(listener) = listener {
            listener.abort();
        }
        if was_subscribed {
            tracing::debug!("Device store unsubscribed");
        }
    }

    /// Removes this device from the signed-in user's registration document
    /// and forgets the cached user. Call this before signing the user out,
    /// while their credentials still authorize the delete.
    ///
    /// The cached user is cleared immediately; the returned handle resolves
    /// once the delete has been attempted. When nothing was registered the
    /// handle resolves to `Ok` without touching the store.
    #[tracing::instrument(skip(self))]
    pub fn sign_out(&self) -> JoinHandle<Result<()>> {
        let Some(user_id) = self.inner.state().take_sign_out() else {
            return tokio::spawn(async { Ok(()) });
        };

        let path = self.inner.document_path(&user_id);
        let field = FieldPath::new([DEVICES_FIELD.to_string(), self.inner.device.device_id()]);
        let documents = Arc::clone(&self.inner.documents);
        let span = tracing::info_span!("delete_device", user_id = %user_id);
        tokio::spawn(
            async move {
                if let Err(e) = documents.delete_field(&path, &field).await {
                    tracing::error!(error = %e, path = %path, "Failed to delete device registration");
                    return Err(e.into());
                }
                Ok(())
            }
            .instrument(span),
        )
    }
}

/// Assembles a [`DeviceStore`] from its collaborators.
#[derive(Debug, Default)]
pub struct DeviceStoreBuilder {
    config: DeviceStoreConfig,
    sessions: Option<Arc<dyn SessionProvider>>,
    tokens: Option<Arc<dyn TokenIssuer>>,
    documents: Option<Arc<dyn DocumentStore>>,
    permissions: Option<Arc<dyn NotificationPermissions>>,
    device: Option<Arc<dyn DeviceDescriber>>,
}

impl DeviceStoreBuilder {
    #[must_use]
    pub fn new(config: DeviceStoreConfig) -> Self {
        Self { config, ..Self::default() }
    }

    #[must_use]
    pub fn with_sessions(mut self, sessions: Arc<dyn SessionProvider>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    #[must_use]
    pub fn with_tokens(mut self, tokens: Arc<dyn TokenIssuer>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    #[must_use]
    pub fn with_documents(mut self, documents: Arc<dyn DocumentStore>) -> Self {
        self.documents = Some(documents);
        self
    }

    /// Optional; defaults to a gate that always allows notifications.
    #[must_use]
    pub fn with_permissions(mut self, permissions: Arc<dyn NotificationPermissions>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    #[must_use]
    pub fn with_device_info(mut self, device: Arc<dyn DeviceDescriber>) -> Self {
        self.device = Some(device);
        self
    }

    /// Builds the store and starts listening for token rotations.
    ///
    /// Must be called from within a Tokio runtime; the rotation listener
    /// task is spawned here.
    ///
    /// # Errors
    /// Returns `DeviceStoreError::MissingCollaborator` if a required
    /// collaborator was not provided.
    pub fn build(self) -> Result<DeviceStore> {
        let sessions = self.sessions.ok_or(DeviceStoreError::MissingCollaborator("sessions"))?;
        let tokens = self.tokens.ok_or(DeviceStoreError::MissingCollaborator("tokens"))?;
        let documents = self.documents.ok_or(DeviceStoreError::MissingCollaborator("documents"))?;
        let device = self.device.ok_or(DeviceStoreError::MissingCollaborator("device_info"))?;
        let permissions = self.permissions.unwrap_or_else(|| Arc::new(AlwaysAllowed));

        let inner = Arc::new(StoreInner {
            config: self.config,
            sessions,
            tokens,
            documents,
            permissions,
            device,
            state: Mutex::new(SyncState::default()),
            session_listener: Mutex::new(None),
        });
        spawn_rotation_intake(&inner);

        Ok(DeviceStore { inner })
    }
}
