use serde::{Deserialize, Serialize};

use crate::domain::{Bill, BillId, BillStatus};

/// Uploads a receipt and reserves a bill record for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillRequest {
    pub email: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub file_b64: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBill {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BillId>,
    pub file_url: String,
    pub key: BillId,
}

/// Bill fields as collected from the form, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillDraft {
    pub email: String,
    #[serde(rename = "type")]
    pub expense_type: String,
    pub name: String,
    pub amount: f64,
    pub date: String,
    pub vat: String,
    pub pct: u32,
    pub commentary: String,
    pub file_url: String,
    pub file_name: String,
    pub status: BillStatus,
}

impl BillDraft {
    pub fn into_bill(self, id: BillId) -> Bill {
        Bill {
            id,
            email: self.email,
            expense_type: self.expense_type,
            name: self.name,
            amount: self.amount,
            date: self.date,
            vat: self.vat,
            pct: self.pct,
            commentary: self.commentary,
            comment_admin: None,
            file_name: self.file_name,
            file_url: Some(self.file_url),
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateBillRequest {
    pub selector: BillId,
    pub bill: BillDraft,
}
