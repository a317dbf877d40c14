use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use shared::{
    domain::{Bill, BillId, BillStatus},
    error::RemoteFetchError,
    protocol::{CreateBillRequest, CreatedBill, UpdateBillRequest},
};
use tracing::debug;

use super::BillStore;

const RECEIPT_BASE_URL: &str = "https://localhost:3456/images";

#[derive(Default)]
struct InMemoryState {
    bills: Vec<Bill>,
    uploads: HashMap<BillId, String>,
    fail_list: Option<RemoteFetchError>,
    fail_create: Option<RemoteFetchError>,
    fail_update: Option<RemoteFetchError>,
    list_calls: usize,
    create_calls: usize,
    update_calls: usize,
}

/// Process-local bill store. Backs the offline CLI mode and tests; failures
/// can be queued per operation and fire once.
#[derive(Default)]
pub struct InMemoryBillStore {
    state: Mutex<InMemoryState>,
}

impl InMemoryBillStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bills(bills: Vec<Bill>) -> Self {
        let store = Self::new();
        store.state().bills = bills;
        store
    }

    pub fn fail_next_list(&self, error: RemoteFetchError) {
        self.state().fail_list = Some(error);
    }

    pub fn fail_next_create(&self, error: RemoteFetchError) {
        self.state().fail_create = Some(error);
    }

    pub fn fail_next_update(&self, error: RemoteFetchError) {
        self.state().fail_update = Some(error);
    }

    pub fn bills(&self) -> Vec<Bill> {
        self.state().bills.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state().list_calls
    }

    pub fn create_calls(&self) -> usize {
        self.state().create_calls
    }

    pub fn update_calls(&self) -> usize {
        self.state().update_calls
    }

    fn state(&self) -> MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BillStore for InMemoryBillStore {
    async fn list(&self) -> Result<Vec<Bill>, RemoteFetchError> {
        let mut state = self.state();
        state.list_calls += 1;
        if let Some(err) = state.fail_list.take() {
            return Err(err);
        }
        Ok(state.bills.clone())
    }

    async fn create(&self, request: CreateBillRequest) -> Result<CreatedBill, RemoteFetchError> {
        let mut state = self.state();
        state.create_calls += 1;
        if let Some(err) = state.fail_create.take() {
            return Err(err);
        }

        let key = BillId::generate();
        let file_url = format!("{RECEIPT_BASE_URL}/{}", request.file_name);
        debug!(key = %key, email = %request.email, "stored receipt upload");
        state.uploads.insert(key.clone(), file_url.clone());
        Ok(CreatedBill {
            id: Some(key.clone()),
            file_url,
            key,
        })
    }

    async fn update(&self, request: UpdateBillRequest) -> Result<Bill, RemoteFetchError> {
        let mut state = self.state();
        state.update_calls += 1;
        if let Some(err) = state.fail_update.take() {
            return Err(err);
        }

        let exists = state.uploads.contains_key(&request.selector)
            || state.bills.iter().any(|bill| bill.id == request.selector);
        if !exists {
            return Err(RemoteFetchError::not_found(format!(
                "no bill with key {}",
                request.selector
            )));
        }

        state.uploads.remove(&request.selector);
        let bill = request.bill.into_bill(request.selector);
        match state.bills.iter_mut().find(|existing| existing.id == bill.id) {
            Some(existing) => *existing = bill.clone(),
            None => state.bills.push(bill.clone()),
        }
        Ok(bill)
    }
}

/// Sample data set used by the offline mode.
pub fn fixture_bills() -> Vec<Bill> {
    let bill = |id: &str,
                name: &str,
                expense_type: &str,
                amount: f64,
                date: &str,
                status: BillStatus,
                file_name: &str| Bill {
        id: BillId::new(id),
        email: "a@a".to_string(),
        expense_type: expense_type.to_string(),
        name: name.to_string(),
        amount,
        date: date.to_string(),
        vat: "80".to_string(),
        pct: 20,
        commentary: "séminaire billed".to_string(),
        comment_admin: None,
        file_name: file_name.to_string(),
        file_url: Some(format!("https://test.storage.tld/v0/b/billable/{file_name}")),
        status,
    };

    vec![
        bill(
            "47qAXb6fIm2zOKkLzMro",
            "encore",
            "Hôtel et logement",
            400.0,
            "2004-04-04",
            BillStatus::Pending,
            "preview-facture-free-201801-pdf-1.jpg",
        ),
        bill(
            "BeKy5Mo4jkmdfPGYpTxZ",
            "test1",
            "Services en ligne",
            100.0,
            "2001-01-01",
            BillStatus::Refused,
            "1592770761.jpeg",
        ),
        bill(
            "UIUZtnPQvnbFnB0ozvJh",
            "test3",
            "Services en ligne",
            300.0,
            "2003-03-03",
            BillStatus::Accepted,
            "facture-client-php-exportee-dans-document-pdf-enregistre-sur-disque-dur.png",
        ),
        bill(
            "qcCK3SzECmaZAGRrHjaC",
            "test2",
            "Restaurants et bars",
            200.0,
            "2002-02-02",
            BillStatus::Refused,
            "preview-facture-free-201801-pdf-1.jpg",
        ),
    ]
}
