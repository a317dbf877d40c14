use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, patch},
    Json, Router as HttpRouter,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::{
    domain::{BillId, BillStatus},
    error::{ApiError, ErrorCode, FetchErrorKind},
    protocol::{BillDraft, CreateBillRequest, CreatedBill, UpdateBillRequest},
};
use tokio::net::TcpListener;

use crate::{
    session::{MemorySessionStore, SessionStore, JWT_KEY},
    store::{fixture_bills, BillStore, HttpBillStore},
};

const TOKEN: &str = "jwt-token";

async fn serve(app: HttpRouter) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}/")
}

fn signed_in() -> Arc<MemorySessionStore> {
    let session = MemorySessionStore::new();
    session.set(JWT_KEY, TOKEN).expect("set token");
    Arc::new(session)
}

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some("Bearer jwt-token")
}

async fn list_bills(headers: HeaderMap) -> impl IntoResponse {
    if !bearer_ok(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ApiError::new(ErrorCode::Unauthorized, "missing token")),
        )
            .into_response();
    }
    Json(fixture_bills()).into_response()
}

#[derive(Default)]
struct Recorded {
    uploads: Vec<CreateBillRequest>,
    updates: Vec<(String, BillDraft)>,
}

type Shared = Arc<Mutex<Recorded>>;

async fn create_bill(
    State(recorded): State<Shared>,
    Json(request): Json<CreateBillRequest>,
) -> Json<CreatedBill> {
    let file_url = format!("https://test.storage.tld/{}", request.file_name);
    recorded.lock().expect("recorded").uploads.push(request);
    Json(CreatedBill {
        id: None,
        file_url,
        key: BillId::new("1234"),
    })
}

async fn update_bill(
    State(recorded): State<Shared>,
    Path(key): Path<String>,
    Json(draft): Json<BillDraft>,
) -> impl IntoResponse {
    recorded
        .lock()
        .expect("recorded")
        .updates
        .push((key.clone(), draft.clone()));
    Json(draft.into_bill(BillId::new(key)))
}

#[tokio::test]
async fn list_sends_bearer_token_and_parses_bills() {
    let base = serve(HttpRouter::new().route("/bills", get(list_bills))).await;
    let store = HttpBillStore::new(&base, signed_in()).expect("store");

    let bills = store.list().await.expect("list");

    assert_eq!(bills, fixture_bills());
}

#[tokio::test]
async fn corrupted_records_do_not_sink_the_list() {
    let app = HttpRouter::new().route(
        "/bills",
        get(|| async {
            Json(serde_json::json!([
                {"id": "ok", "type": "Transports", "date": "2004-04-04", "status": "pending"},
                {"id": "no-date", "type": "Transports", "date": null, "status": "accepted"},
                {"id": "bad-status", "type": "Transports", "date": "2003-03-03", "status": "lost"},
            ]))
        }),
    );
    let base = serve(app).await;
    let store = HttpBillStore::new(&base, signed_in()).expect("store");

    let bills = store.list().await.expect("list");

    let ids: Vec<_> = bills.iter().map(|bill| bill.id.as_str()).collect();
    assert_eq!(ids, ["ok", "no-date"]);
    assert_eq!(bills[1].date, "");
}

#[tokio::test]
async fn missing_token_surfaces_server_message() {
    let base = serve(HttpRouter::new().route("/bills", get(list_bills))).await;
    let store = HttpBillStore::new(&base, Arc::new(MemorySessionStore::new())).expect("store");

    let err = store.list().await.expect_err("unauthorized");

    assert_eq!(err.kind, FetchErrorKind::Unknown);
    assert_eq!(err.message, "missing token");
}

#[tokio::test]
async fn missing_route_is_classified_not_found() {
    let base = serve(HttpRouter::new()).await;
    let store = HttpBillStore::new(&base, signed_in()).expect("store");

    let err = store.list().await.expect_err("404");

    assert_eq!(err.kind, FetchErrorKind::NotFound);
    assert!(err.user_message().starts_with("Erreur 404"));
}

#[tokio::test]
async fn server_failure_is_classified_server_error() {
    let app = HttpRouter::new().route(
        "/bills",
        get(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new(ErrorCode::Internal, "database offline")),
            )
        }),
    );
    let base = serve(app).await;
    let store = HttpBillStore::new(&base, signed_in()).expect("store");

    let err = store.list().await.expect_err("500");

    assert_eq!(err.kind, FetchErrorKind::ServerError);
    assert_eq!(err.message, "database offline");
    assert!(err.user_message().starts_with("Erreur 500"));
}

#[tokio::test]
async fn unreachable_server_is_unknown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    let store = HttpBillStore::new(&format!("http://{addr}/"), signed_in()).expect("store");

    let err = store.list().await.expect_err("connection refused");

    assert_eq!(err.kind, FetchErrorKind::Unknown);
}

#[tokio::test]
async fn create_then_update_hits_post_and_patch() {
    let recorded = Shared::default();
    let app = HttpRouter::new()
        .route("/bills", axum::routing::post(create_bill))
        .route("/bills/:key", patch(update_bill))
        .with_state(recorded.clone());
    let base = serve(app).await;
    let store = HttpBillStore::new(&base, signed_in()).expect("store");

    let created = store
        .create(CreateBillRequest {
            email: "a@a".to_string(),
            file_name: "test.jpg".to_string(),
            mime_type: Some("image/jpg".to_string()),
            file_b64: STANDARD.encode(b"exampleFile"),
        })
        .await
        .expect("create");
    assert_eq!(created.key, BillId::new("1234"));

    let bill = store
        .update(UpdateBillRequest {
            selector: created.key.clone(),
            bill: BillDraft {
                email: "a@a".to_string(),
                expense_type: "Transports".to_string(),
                name: "Vol Paris Londres".to_string(),
                amount: 348.0,
                date: "2023-11-01".to_string(),
                vat: "70".to_string(),
                pct: 20,
                commentary: String::new(),
                file_url: created.file_url.clone(),
                file_name: "test.jpg".to_string(),
                status: BillStatus::Pending,
            },
        })
        .await
        .expect("update");

    assert_eq!(bill.id, BillId::new("1234"));
    assert_eq!(bill.file_url.as_deref(), Some("https://test.storage.tld/test.jpg"));

    let recorded = recorded.lock().expect("recorded");
    assert_eq!(recorded.uploads.len(), 1);
    assert_eq!(
        STANDARD
            .decode(&recorded.uploads[0].file_b64)
            .expect("base64"),
        b"exampleFile"
    );
    assert_eq!(recorded.updates.len(), 1);
    assert_eq!(recorded.updates[0].0, "1234");
    assert_eq!(recorded.updates[0].1.name, "Vol Paris Londres");
}

#[test]
fn endpoints_extend_base_path() {
    let session = Arc::new(MemorySessionStore::new());
    let store = HttpBillStore::new("http://localhost:5678/api", session.clone()).expect("store");
    assert_eq!(
        store.endpoint(&["bills", "abc"]).as_str(),
        "http://localhost:5678/api/bills/abc"
    );

    let store = HttpBillStore::new("http://localhost:5678/", session).expect("store");
    assert_eq!(
        store.endpoint(&["bills"]).as_str(),
        "http://localhost:5678/bills"
    );
}

#[test]
fn opaque_urls_are_rejected() {
    let session = Arc::new(MemorySessionStore::new());
    assert!(HttpBillStore::new("mailto:billing@billed.tld", session.clone()).is_err());
    assert!(HttpBillStore::new("not a url", session).is_err());
}
