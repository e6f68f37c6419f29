//! Purpose: In-process stand-in for the manifest API and the key-value bulk API.
//! Exports: `MockApi`, fixture constants, `fixture_manifest`.
//! Role: Shared by the pipeline and CLI integration tests.
//! Invariants: Binds loopback port 0 on a dedicated thread; one server per test.
//! Invariants: Records every bulk request so tests can assert on uploaded chunks.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use manifest_kv_sync::core::kv_item::KvItem;
use serde_json::{Value, json};

pub const API_KEY: &str = "test-api-key";
pub const KV_TOKEN: &str = "test-kv-token";
pub const ACCOUNT: &str = "acct-1";
pub const NAMESPACE: &str = "ns-1";
pub const VERSION: &str = "226519.24.10.01.1730-1";

pub const CLASS: &str = "DestinyClassDefinition";
pub const RACE: &str = "DestinyRaceDefinition";
pub const ITEM: &str = "DestinyInventoryItemDefinition";
pub const ITEM_LITE: &str = "DestinyInventoryItemLiteDefinition";

#[derive(Default)]
pub struct MockState {
    pub manifest: Mutex<Value>,
    pub tables: Mutex<HashMap<String, Value>>,
    pub uploads: Mutex<Vec<Vec<KvItem>>>,
    pub reject_uploads: AtomicBool,
    pub manifest_requests: AtomicUsize,
    pub table_requests: AtomicUsize,
}

pub struct MockApi {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockApi {
    pub fn start() -> Self {
        let state = Arc::new(MockState::default());
        let (manifest, tables) = fixture_manifest();
        *state.manifest.lock().expect("lock") = manifest;
        *state.tables.lock().expect("lock") = tables;

        let (tx, rx) = std::sync::mpsc::channel();
        let app = router(Arc::clone(&state));
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind");
                tx.send(listener.local_addr().expect("addr")).expect("send addr");
                axum::serve(listener, app).await.expect("serve");
            });
        });
        let addr = rx.recv().expect("server addr");
        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn kv_base_url(&self) -> String {
        format!("{}/client/v4", self.base_url)
    }

    pub fn uploaded_items(&self) -> Vec<KvItem> {
        self.state
            .uploads
            .lock()
            .expect("lock")
            .iter()
            .flatten()
            .cloned()
            .collect()
    }

    pub fn upload_sizes(&self) -> Vec<usize> {
        let mut sizes: Vec<usize> = self
            .state
            .uploads
            .lock()
            .expect("lock")
            .iter()
            .map(Vec::len)
            .collect();
        sizes.sort_unstable();
        sizes
    }

    pub fn manifest_body(&self) -> Value {
        self.state.manifest.lock().expect("lock")["Response"].clone()
    }
}

fn table_path(table: &str) -> String {
    format!("/common/destiny2_content/json/en/{table}-0f3c.json")
}

fn entries(table: &str, count: u32) -> Value {
    let mut map = serde_json::Map::new();
    for hash in 1..=count {
        map.insert(
            hash.to_string(),
            json!({
                "hash": hash,
                "index": hash - 1,
                "displayProperties": {"name": format!("{table} #{hash}")},
            }),
        );
    }
    Value::Object(map)
}

/// Manifest envelope plus table bodies keyed by request path.
pub fn fixture_manifest() -> (Value, HashMap<String, Value>) {
    let counts = [(CLASS, 3), (RACE, 3), (ITEM, 25), (ITEM_LITE, 25)];
    let mut paths = serde_json::Map::new();
    let mut tables = HashMap::new();
    for (table, count) in counts {
        paths.insert(table.to_string(), json!(table_path(table)));
        tables.insert(table_path(table), entries(table, count));
    }
    let manifest = json!({
        "Response": {
            "version": VERSION,
            "jsonWorldComponentContentPaths": { "en": paths },
        },
        "ErrorCode": 1,
        "ThrottleSeconds": 0,
        "ErrorStatus": "Success",
        "Message": "Ok",
    });
    (manifest, tables)
}

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/Platform/Destiny2/Manifest/", get(manifest))
        .route("/common/*rest", get(table))
        .route(
            "/client/v4/accounts/:account/storage/kv/namespaces/:namespace/bulk",
            put(bulk),
        )
        .with_state(state)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

async fn manifest(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.manifest_requests.fetch_add(1, Ordering::SeqCst);
    if header(&headers, "x-api-key") != Some(API_KEY) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "ErrorCode": 2101,
                "ErrorStatus": "ApiInvalidOrExpiredKey",
                "Message": "The API key is invalid.",
            })),
        )
            .into_response();
    }
    let body = state.manifest.lock().expect("lock").clone();
    Json(body).into_response()
}

async fn table(State(state): State<Arc<MockState>>, uri: Uri) -> Response {
    state.table_requests.fetch_add(1, Ordering::SeqCst);
    match state.tables.lock().expect("lock").get(uri.path()) {
        Some(body) => Json(body.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

async fn bulk(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(items): Json<Vec<KvItem>>,
) -> Response {
    let expected = format!("Bearer {KV_TOKEN}");
    if header(&headers, "authorization") != Some(expected.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"success": false, "errors": [{"code": 10000, "message": "Authentication error"}]})),
        )
            .into_response();
    }
    if state.reject_uploads.load(Ordering::SeqCst) {
        return Json(json!({
            "success": false,
            "errors": [{"code": 10001, "message": "bulk write limit exceeded"}],
        }))
        .into_response();
    }
    state.uploads.lock().expect("lock").push(items);
    Json(json!({"success": true, "errors": [], "messages": []})).into_response()
}
