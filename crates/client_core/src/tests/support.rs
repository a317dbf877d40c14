use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use shared::{
    domain::{Bill, BillId, BillStatus, Session},
    error::RemoteFetchError,
    protocol::{CreateBillRequest, CreatedBill, UpdateBillRequest},
};
use tokio::sync::Notify;

use crate::{
    config::NotFoundPolicy,
    containers::{NewBillForm, SelectedFile},
    dom::MemoryRoot,
    router::{Navigator, Route, Router, RouterError},
    session::MemorySessionStore,
    store::{BillStore, InMemoryBillStore},
};

pub(crate) fn bill(id: &str, name: &str, date: &str, status: BillStatus) -> Bill {
    Bill {
        id: BillId::new(id),
        email: "a@a".to_string(),
        expense_type: "Transports".to_string(),
        name: name.to_string(),
        amount: 100.0,
        date: date.to_string(),
        vat: "20".to_string(),
        pct: 20,
        commentary: String::new(),
        comment_admin: None,
        file_name: format!("{id}.jpg"),
        file_url: Some(format!("https://test.storage.tld/{id}.jpg")),
        status,
    }
}

pub(crate) fn jpg_receipt() -> SelectedFile {
    SelectedFile {
        path: r"C:\fakepath\test.jpg".to_string(),
        mime_type: Some("image/jpg".to_string()),
        bytes: b"exampleFile".to_vec(),
    }
}

pub(crate) fn webp_receipt() -> SelectedFile {
    SelectedFile {
        path: "test.webp".to_string(),
        mime_type: Some("image/webp".to_string()),
        bytes: b"exampleFile".to_vec(),
    }
}

pub(crate) fn usb_keys_form() -> NewBillForm {
    NewBillForm {
        expense_type: "IT et électronique".to_string(),
        name: "clefs USB".to_string(),
        date: "2023-11-01".to_string(),
        amount: "39.45".to_string(),
        vat: "20".to_string(),
        pct: "20".to_string(),
        commentary: "Achat lots de clef USB".to_string(),
    }
}

pub(crate) struct Harness {
    pub router: Arc<Router>,
    pub root: Arc<MemoryRoot>,
    pub store: Arc<InMemoryBillStore>,
}

pub(crate) fn harness(store: InMemoryBillStore, session: Option<Session>) -> Harness {
    harness_with_policy(store, session, NotFoundPolicy::KeepCurrent)
}

pub(crate) fn harness_with_policy(
    store: InMemoryBillStore,
    session: Option<Session>,
    policy: NotFoundPolicy,
) -> Harness {
    let store = Arc::new(store);
    let root = Arc::new(MemoryRoot::new());
    let session = Arc::new(match session {
        Some(session) => MemorySessionStore::with_session(&session),
        None => MemorySessionStore::new(),
    });
    let router = Router::new_with_policy(store.clone(), session, root.clone(), policy);
    Harness {
        router,
        root,
        store,
    }
}

/// Records requested routes instead of rendering them.
#[derive(Default)]
pub(crate) struct RecordingNavigator {
    routes: StdMutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().expect("routes").clone()
    }
}

#[async_trait]
impl Navigator for RecordingNavigator {
    async fn navigate(&self, route: Route) -> Result<(), RouterError> {
        self.routes.lock().expect("routes").push(route);
        Ok(())
    }
}

/// Holds every `create` call until `release` is notified.
#[derive(Default)]
pub(crate) struct GatedBillStore {
    pub inner: InMemoryBillStore,
    pub entered: Notify,
    pub release: Notify,
}

#[async_trait]
impl BillStore for GatedBillStore {
    async fn list(&self) -> Result<Vec<Bill>, RemoteFetchError> {
        self.inner.list().await
    }

    async fn create(&self, request: CreateBillRequest) -> Result<CreatedBill, RemoteFetchError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.create(request).await
    }

    async fn update(&self, request: UpdateBillRequest) -> Result<Bill, RemoteFetchError> {
        self.inner.update(request).await
    }
}

/// Holds every `list` call until `release` is notified.
#[derive(Default)]
pub(crate) struct GatedListStore {
    pub inner: InMemoryBillStore,
    pub entered: Notify,
    pub release: Notify,
}

impl GatedListStore {
    pub fn with_bills(bills: Vec<Bill>) -> Self {
        Self {
            inner: InMemoryBillStore::with_bills(bills),
            ..Self::default()
        }
    }
}

#[async_trait]
impl BillStore for GatedListStore {
    async fn list(&self) -> Result<Vec<Bill>, RemoteFetchError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.list().await
    }

    async fn create(&self, request: CreateBillRequest) -> Result<CreatedBill, RemoteFetchError> {
        self.inner.create(request).await
    }

    async fn update(&self, request: UpdateBillRequest) -> Result<Bill, RemoteFetchError> {
        self.inner.update(request).await
    }
}
