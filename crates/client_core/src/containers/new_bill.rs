use std::{path::Path, sync::Arc};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::{
    domain::{Bill, BillStatus},
    error::RemoteFetchError,
    protocol::{BillDraft, CreateBillRequest, UpdateBillRequest},
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    dom::ViewRoot,
    router::{Navigator, Route, RouterError},
    session::{load_session, SessionError, SessionStore},
    store::BillStore,
};

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
pub const INVALID_EXTENSION_MESSAGE: &str =
    "Seuls les fichiers jpg, jpeg et png sont acceptés comme justificatif.";
pub const MISSING_RECEIPT_MESSAGE: &str = "Veuillez joindre un justificatif.";
pub const INVALID_NUMBER_MESSAGE: &str = "Le montant ou le pourcentage saisi n'est pas un nombre.";
const DEFAULT_PCT: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    FileSelected,
    Submitting,
    Succeeded,
    Failed,
}

/// A file picked in the receipt input. `path` may be a full client path.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub path: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{file_name}` is not a jpg, jpeg or png file")]
pub struct InvalidFileExtension {
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSelection {
    Accepted { file_name: String },
    Rejected(InvalidFileExtension),
    /// A submission is in flight; the selection was ignored.
    Busy,
}

/// Raw form values, as typed.
#[derive(Debug, Clone, Default)]
pub struct NewBillForm {
    pub expense_type: String,
    pub name: String,
    pub date: String,
    pub amount: String,
    pub vat: String,
    pub pct: String,
    pub commentary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{value}` is not a valid {field}")]
pub struct InvalidNumber {
    pub field: &'static str,
    pub value: String,
}

/// Accepts `39.45`, `39,45` and `1 234,50`.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let normalized: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

impl NewBillForm {
    /// `amount` is required. An empty `pct` means 20; a fractional one keeps
    /// its integer part. `vat` is kept as typed.
    fn into_draft(self, email: String, file_name: String) -> Result<BillDraft, InvalidNumber> {
        let amount = parse_decimal(&self.amount).ok_or_else(|| InvalidNumber {
            field: "amount",
            value: self.amount.clone(),
        })?;
        let pct = if self.pct.trim().is_empty() {
            DEFAULT_PCT
        } else {
            parse_decimal(&self.pct)
                .filter(|pct| *pct >= 0.0 && *pct <= f64::from(u32::MAX))
                .map(|pct| pct.trunc() as u32)
                .ok_or_else(|| InvalidNumber {
                    field: "pct",
                    value: self.pct.clone(),
                })?
        };
        Ok(BillDraft {
            email,
            expense_type: self.expense_type,
            name: self.name,
            amount,
            date: self.date,
            vat: self.vat,
            pct,
            commentary: self.commentary,
            file_url: String::new(),
            file_name,
            status: BillStatus::Pending,
        })
    }
}

#[derive(Debug, Error)]
pub enum NewBillError {
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    #[error("no accepted receipt is attached to the form")]
    MissingReceipt,
    #[error("no signed-in user")]
    SessionMissing,
    #[error(transparent)]
    InvalidNumber(#[from] InvalidNumber),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Remote(#[from] RemoteFetchError),
    #[error(transparent)]
    Navigation(#[from] RouterError),
}

#[derive(Debug, Clone)]
struct AcceptedFile {
    file_name: String,
    mime_type: Option<String>,
    bytes: Vec<u8>,
}

struct NewBillState {
    state: SubmissionState,
    file: Option<AcceptedFile>,
    last_error: Option<RemoteFetchError>,
}

pub struct NewBill {
    store: Arc<dyn BillStore>,
    root: Arc<dyn ViewRoot>,
    session: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    inner: Mutex<NewBillState>,
}

/// Last segment of a `/` or `\` separated path.
pub fn file_name_from_path(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

pub fn has_allowed_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

impl NewBill {
    pub fn new(
        store: Arc<dyn BillStore>,
        root: Arc<dyn ViewRoot>,
        session: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            store,
            root,
            session,
            navigator,
            inner: Mutex::new(NewBillState {
                state: SubmissionState::Idle,
                file: None,
                last_error: None,
            }),
        }
    }

    pub async fn state(&self) -> SubmissionState {
        self.inner.lock().await.state
    }

    pub async fn selected_file_name(&self) -> Option<String> {
        self.inner
            .lock()
            .await
            .file
            .as_ref()
            .map(|file| file.file_name.clone())
    }

    pub async fn last_error(&self) -> Option<RemoteFetchError> {
        self.inner.lock().await.last_error.clone()
    }

    pub async fn handle_change_file(&self, file: SelectedFile) -> FileSelection {
        let file_name = file_name_from_path(&file.path).to_string();
        let mut inner = self.inner.lock().await;
        if inner.state == SubmissionState::Submitting {
            return FileSelection::Busy;
        }

        if !has_allowed_extension(&file_name) {
            warn!(file_name = %file_name, "rejected receipt with unsupported extension");
            inner.file = None;
            inner.state = SubmissionState::Idle;
            drop(inner);
            self.root.alert(INVALID_EXTENSION_MESSAGE);
            self.root.reset_file_input();
            return FileSelection::Rejected(InvalidFileExtension { file_name });
        }

        info!(file_name = %file_name, "receipt selected");
        inner.file = Some(AcceptedFile {
            file_name: file_name.clone(),
            mime_type: file.mime_type,
            bytes: file.bytes,
        });
        inner.state = SubmissionState::FileSelected;
        FileSelection::Accepted { file_name }
    }

    /// Uploads the receipt, records the bill, then shows the bill list.
    /// On a store failure the form stays on screen with the error and a new
    /// submit retries. Unreadable numbers are reported before any store call.
    pub async fn handle_submit(&self, form: NewBillForm) -> Result<Bill, NewBillError> {
        let (file, draft) = {
            let mut inner = self.inner.lock().await;
            if inner.state == SubmissionState::Submitting {
                return Err(NewBillError::SubmissionInFlight);
            }
            let Some(file) = inner.file.clone() else {
                drop(inner);
                self.root.alert(MISSING_RECEIPT_MESSAGE);
                return Err(NewBillError::MissingReceipt);
            };
            let session = load_session(self.session.as_ref())?.ok_or(NewBillError::SessionMissing)?;
            let draft = match form.into_draft(session.email, file.file_name.clone()) {
                Ok(draft) => draft,
                Err(err) => {
                    drop(inner);
                    warn!(field = err.field, value = %err.value, "rejected unreadable number");
                    self.root.show_form_error(INVALID_NUMBER_MESSAGE);
                    return Err(err.into());
                }
            };
            inner.state = SubmissionState::Submitting;
            inner.last_error = None;
            (file, draft)
        };

        match self.send(file, draft).await {
            Ok(bill) => {
                self.inner.lock().await.state = SubmissionState::Succeeded;
                info!(bill_id = %bill.id, "bill submitted");
                self.navigator.navigate(Route::Bills).await?;
                Ok(bill)
            }
            Err(err) => {
                warn!(kind = ?err.kind, error = %err, "bill submission failed");
                {
                    let mut inner = self.inner.lock().await;
                    inner.state = SubmissionState::Failed;
                    inner.last_error = Some(err.clone());
                }
                self.root.show_form_error(&err.user_message());
                Err(err.into())
            }
        }
    }

    async fn send(&self, file: AcceptedFile, mut draft: BillDraft) -> Result<Bill, RemoteFetchError> {
        let created = self
            .store
            .create(CreateBillRequest {
                email: draft.email.clone(),
                file_name: file.file_name,
                mime_type: file.mime_type,
                file_b64: STANDARD.encode(&file.bytes),
            })
            .await?;

        draft.file_url = created.file_url;
        self.store
            .update(UpdateBillRequest {
                selector: created.key,
                bill: draft,
            })
            .await
    }
}
