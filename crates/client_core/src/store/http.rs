use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::Bill,
    error::{ApiError, FetchErrorKind, RemoteFetchError},
    protocol::{CreateBillRequest, CreatedBill, UpdateBillRequest},
};
use tracing::{debug, warn};
use url::Url;

use super::BillStore;
use crate::session::{SessionStore, JWT_KEY};

/// Bills API over HTTP: `GET /bills`, `POST /bills`, `PATCH /bills/{key}`.
pub struct HttpBillStore {
    http: Client,
    base_url: Url,
    session: Arc<dyn SessionStore>,
}

impl HttpBillStore {
    pub fn new(api_url: &str, session: Arc<dyn SessionStore>) -> Result<Self> {
        let base_url =
            Url::parse(api_url).with_context(|| format!("invalid bills API url: {api_url}"))?;
        if base_url.cannot_be_a_base() {
            bail!("bills API url must be hierarchical: {api_url}");
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            session,
        })
    }

    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.get(JWT_KEY) {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, RemoteFetchError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        debug!(operation, "bills API call succeeded");
        response.json::<T>().await.map_err(|err| {
            RemoteFetchError::unknown(format!("invalid {operation} response payload: {err}"))
        })
    }
}

fn transport_error(err: reqwest::Error) -> RemoteFetchError {
    let kind = err
        .status()
        .map(|status| FetchErrorKind::from_status(status.as_u16()))
        .unwrap_or(FetchErrorKind::Unknown);
    RemoteFetchError::new(kind, err.to_string())
}

async fn check_status(response: Response) -> Result<Response, RemoteFetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let mut error = match serde_json::from_str::<ApiError>(&body) {
        Ok(api_error) => RemoteFetchError::from(api_error),
        Err(_) if body.trim().is_empty() => RemoteFetchError::unknown(status.to_string()),
        Err(_) => RemoteFetchError::unknown(body),
    };
    let from_status = FetchErrorKind::from_status(status.as_u16());
    if from_status != FetchErrorKind::Unknown {
        error.kind = from_status;
    }
    Err(error)
}

#[async_trait]
impl BillStore for HttpBillStore {
    /// Records that do not decode as a bill are skipped, not fatal.
    async fn list(&self) -> Result<Vec<Bill>, RemoteFetchError> {
        let url = self.endpoint(&["bills"]);
        let records: Vec<serde_json::Value> = self.execute("list", self.http.get(url)).await?;
        Ok(records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<Bill>(record) {
                Ok(bill) => Some(bill),
                Err(err) => {
                    warn!(error = %err, "skipping unreadable bill record");
                    None
                }
            })
            .collect())
    }

    async fn create(&self, request: CreateBillRequest) -> Result<CreatedBill, RemoteFetchError> {
        let url = self.endpoint(&["bills"]);
        self.execute("create", self.http.post(url).json(&request))
            .await
    }

    async fn update(&self, request: UpdateBillRequest) -> Result<Bill, RemoteFetchError> {
        let url = self.endpoint(&["bills", request.selector.as_str()]);
        self.execute("update", self.http.patch(url).json(&request.bill))
            .await
    }
}
