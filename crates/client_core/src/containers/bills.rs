use std::{cmp::Reverse, sync::Arc};

use shared::{domain::Bill, error::RemoteFetchError};
use tracing::{debug, info};

use crate::{
    dom::{Element, ViewRoot},
    format::{display_date, format_status},
    router::{Navigator, Route, RouterError},
    store::BillStore,
    views::{self, ViewError},
};

/// A bill ready for the list view.
#[derive(Debug, Clone, PartialEq)]
pub struct BillRow {
    pub bill: Bill,
    pub display_date: String,
    pub status_label: &'static str,
}

impl From<Bill> for BillRow {
    fn from(bill: Bill) -> Self {
        Self {
            display_date: display_date(&bill.date),
            status_label: format_status(bill.status),
            bill,
        }
    }
}

/// Most recent first. Stable, so bills sharing a date keep their relative
/// order; bills whose date does not parse sink to the end.
pub fn sort_newest_first(mut bills: Vec<Bill>) -> Vec<Bill> {
    bills.sort_by_cached_key(|bill| Reverse(bill.parsed_date()));
    bills
}

pub struct Bills {
    store: Arc<dyn BillStore>,
    root: Arc<dyn ViewRoot>,
    navigator: Arc<dyn Navigator>,
}

impl Bills {
    pub fn new(
        store: Arc<dyn BillStore>,
        root: Arc<dyn ViewRoot>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            store,
            root,
            navigator,
        }
    }

    pub async fn list(&self) -> Result<Vec<BillRow>, RemoteFetchError> {
        let bills = self.store.list().await?;
        debug!(count = bills.len(), "fetched bills");
        Ok(sort_newest_first(bills)
            .into_iter()
            .map(BillRow::from)
            .collect())
    }

    /// Opens the receipt modal for the clicked eye icon.
    pub fn handle_click_icon_eye(&self, target: &Element) -> Result<(), ViewError> {
        let url = target
            .data("bill-url")
            .map(str::trim)
            .filter(|url| !url.is_empty() && *url != "null");
        let width = self.root.modal_width() / 2;
        info!(has_receipt = url.is_some(), "opening receipt modal");
        self.root.open_modal(views::receipt_modal(url, width)?);
        Ok(())
    }

    pub async fn handle_click_new_bill(&self) -> Result<(), RouterError> {
        self.navigator.navigate(Route::NewBill).await
    }
}
