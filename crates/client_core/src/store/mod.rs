//! Remote store client for bills.

use async_trait::async_trait;
use shared::{
    domain::Bill,
    error::RemoteFetchError,
    protocol::{CreateBillRequest, CreatedBill, UpdateBillRequest},
};

mod http;
mod memory;

pub use http::HttpBillStore;
pub use memory::{fixture_bills, InMemoryBillStore};

/// Backend operations on bills. Failures carry the status classification
/// observed by the implementation.
#[async_trait]
pub trait BillStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Bill>, RemoteFetchError>;
    async fn create(&self, request: CreateBillRequest) -> Result<CreatedBill, RemoteFetchError>;
    async fn update(&self, request: UpdateBillRequest) -> Result<Bill, RemoteFetchError>;
}
