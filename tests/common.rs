#![allow(dead_code)]

use async_trait::async_trait;
use firebase_device_store::{
    AuthUser, DeviceStore, DeviceStoreConfig, DocumentPath, DocumentStore, FieldPath, NotificationPermissions,
    SessionProvider, StaticDeviceInfo, StoreError, TokenError, TokenIssuer, TokenRelay, TokenRotation, UserDevices,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot, watch};

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("firebase_device_store=debug".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap())
            .add_directive("rustls=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

/// Polls `cond` until it holds or the deadline passes.
pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let start = std::time::Instant::now();
    while start.elapsed() < Duration::from_secs(5) {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Gives spawned tasks a chance to run before asserting that nothing happened.
pub async fn let_tasks_settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[derive(Debug)]
pub struct FakeSessions {
    sender: watch::Sender<Option<AuthUser>>,
}

impl FakeSessions {
    pub fn new(initial: Option<AuthUser>) -> Self {
        let (sender, _rx) = watch::channel(initial);
        Self { sender }
    }

    pub fn sign_in(&self, uid: &str) {
        self.sender.send_replace(Some(AuthUser::new(uid)));
    }

    pub fn end_session(&self) {
        self.sender.send_replace(None);
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl SessionProvider for FakeSessions {
    fn current_user(&self) -> Option<AuthUser> {
        self.sender.borrow().clone()
    }

    fn watch_sessions(&self) -> watch::Receiver<Option<AuthUser>> {
        self.sender.subscribe()
    }
}

/// Token issuer whose fetches stay pending until the test resolves them,
/// so tests control the order token and session events land in.
#[derive(Debug, Default)]
pub struct FakeTokens {
    relay: TokenRelay,
    requests: AtomicUsize,
    pending: Mutex<Vec<oneshot::Sender<Result<String, TokenError>>>>,
}

impl FakeTokens {
    pub fn new() -> Self {
        Self { relay: TokenRelay::new(), requests: AtomicUsize::new(0), pending: Mutex::new(Vec::new()) }
    }

    pub fn fetch_requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn pending_fetches(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Resolves the oldest pending fetch.
    pub fn resolve_fetch(&self, result: Result<String, TokenError>) {
        let mut pending = self.pending.lock().unwrap();
        assert!(!pending.is_empty(), "no pending token fetch to resolve");
        let _ = pending.remove(0).send(result);
    }

    pub fn rotate(&self, token: Option<&str>) {
        self.relay.publish(token.map(String::from));
    }
}

#[async_trait]
impl TokenIssuer for FakeTokens {
    async fn request_token(&self) -> Result<String, TokenError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().push(tx);
        rx.await.unwrap_or_else(|_| Err(TokenError::Unavailable("fetch abandoned".to_string())))
    }

    fn subscribe_rotations(&self) -> broadcast::Receiver<TokenRotation> {
        self.relay.subscribe()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Merge { path: String, doc: UserDevices },
    DeleteField { path: String, field: String },
}

/// In-memory [`DocumentStore`] that applies merge semantics and keeps an
/// operation log for assertions.
#[derive(Debug, Default)]
pub struct MemoryDocStore {
    docs: Mutex<HashMap<String, UserDevices>>,
    ops: Mutex<Vec<StoreOp>>,
    fail_deletes: AtomicBool,
}

impl MemoryDocStore {
    pub fn ops(&self) -> Vec<StoreOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn op_count(&self) -> usize {
        self.ops.lock().unwrap().len()
    }

    pub fn clear_ops(&self) {
        self.ops.lock().unwrap().clear();
    }

    pub fn document(&self, path: &str) -> Option<UserDevices> {
        self.docs.lock().unwrap().get(path).cloned()
    }

    /// Makes every subsequent delete fail with a rejection.
    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for MemoryDocStore {
    async fn merge_write(&self, path: &DocumentPath, doc: &UserDevices) -> Result<(), StoreError> {
        let mut docs = self.docs.lock().unwrap();
        let entry = docs
            .entry(path.to_string())
            .or_insert_with(|| UserDevices { user_id: doc.user_id.clone(), devices: HashMap::new() });
        entry.user_id.clone_from(&doc.user_id);
        for (device_id, record) in &doc.devices {
            entry.devices.insert(device_id.clone(), record.clone());
        }
        drop(docs);

        self.ops.lock().unwrap().push(StoreOp::Merge { path: path.to_string(), doc: doc.clone() });
        Ok(())
    }

    async fn delete_field(&self, path: &DocumentPath, field: &FieldPath) -> Result<(), StoreError> {
        self.ops
            .lock()
            .unwrap()
            .push(StoreOp::DeleteField { path: path.to_string(), field: field.to_string() });
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected { status: 503, message: "injected delete failure".to_string() });
        }

        let mut docs = self.docs.lock().unwrap();
        // A missing document is a no-op, like the real store.
        if let Some(doc) = docs.get_mut(&path.to_string())
            && let [map, device_id] = field.segments()
            && map.as_str() == "devices"
        {
            doc.devices.remove(device_id.as_str());
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct DeniedPermissions;

impl NotificationPermissions for DeniedPermissions {
    fn notifications_enabled(&self) -> bool {
        false
    }
}

pub const DEVICE_ID: &str = "dev-1";

pub struct Harness {
    pub store: DeviceStore,
    pub sessions: Arc<FakeSessions>,
    pub tokens: Arc<FakeTokens>,
    pub docs: Arc<MemoryDocStore>,
}

/// Builds a store wired to fakes, optionally with a user already signed in.
pub fn harness(initial_user: Option<&str>) -> Harness {
    setup_tracing();
    let sessions = Arc::new(FakeSessions::new(initial_user.map(AuthUser::new)));
    let tokens = Arc::new(FakeTokens::new());
    let docs = Arc::new(MemoryDocStore::default());
    let device = Arc::new(StaticDeviceInfo::new(DEVICE_ID).with_name("Test rig").with_os("test-os 1.0"));

    let store = DeviceStore::builder(DeviceStoreConfig::default())
        .with_sessions(Arc::clone(&sessions) as Arc<dyn SessionProvider>)
        .with_tokens(Arc::clone(&tokens) as Arc<dyn TokenIssuer>)
        .with_documents(Arc::clone(&docs) as Arc<dyn DocumentStore>)
        .with_device_info(device)
        .build()
        .expect("all collaborators provided");

    Harness { store, sessions, tokens, docs }
}
