//! # REST + WebSocket API
//!
//! Builds the axum router that exposes the peer's HTTP interface. All
//! endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                 | Description                         |
//! |--------|----------------------|-------------------------------------|
//! | GET    | `/health`            | Liveness probe                      |
//! | GET    | `/status`            | Peer status summary                 |
//! | POST   | `/rpc`               | JSON-RPC 2.0 gateway                |
//! | GET    | `/ws`                | WebSocket stream of commit events   |
//! | GET    | `/transactions/:id`  | Committed transaction log record    |
//!
//! ## JSON-RPC
//!
//! Two methods, `cloister_submit` and `cloister_evaluate`, both taking
//!
//! ```json
//! {
//!   "function": "CreateAsset",
//!   "args": [],
//!   "identity": { "id": "x509::...", "mspId": "Org1MSP" },
//!   "transient": { "asset_properties": "7b226f626a65..." }
//! }
//! ```
//!
//! The identity is asserted by the gateway in front of the node. Transient
//! values are hex so that the bytes a client hashes are the bytes the
//! contract stores. `cloister_evaluate` refuses functions that write.
//!
//! Contract failures use one code per error kind in the server range
//! (`-32001` through `-32008`). Envelope problems use the standard codes.

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use cloister_contracts::{AssetTransferContract, ContractError, ErrorKind, Execution, Function};
use cloister_protocol::identity::ClientIdentity;
use cloister_protocol::transaction::{Invocation, Peer, TransientMap};

use crate::metrics::SharedMetrics;

/// Broadcast channel capacity for live event streaming.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

pub const METHOD_SUBMIT: &str = "cloister_submit";
pub const METHOD_EVALUATE: &str = "cloister_evaluate";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// JSON-RPC error code for a contract failure of the given kind.
pub fn error_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Validation => -32001,
        ErrorKind::Conflict => -32002,
        ErrorKind::NotFound => -32003,
        ErrorKind::Identity => -32004,
        ErrorKind::Authorization => -32005,
        ErrorKind::AgreementMismatch => -32006,
        ErrorKind::Decode => -32007,
        ErrorKind::Substrate => -32008,
    }
}

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone. The peer and metrics are behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// This organization's peer over the shared ledger.
    pub peer: Peer,
    pub contract: AssetTransferContract,
    /// Broadcast channel for commit notifications.
    pub event_tx: broadcast::Sender<NodeEvent>,
    pub metrics: SharedMetrics,
}

impl AppState {
    pub fn new(peer: Peer, metrics: SharedMetrics) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            version: format!(
                "{} (protocol {})",
                env!("CARGO_PKG_VERSION"),
                cloister_protocol::config::PROTOCOL_VERSION,
            ),
            peer,
            contract: AssetTransferContract,
            event_tx,
            metrics,
        }
    }
}

/// Events pushed to WebSocket subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeEvent {
    /// A transaction was committed by this peer.
    #[serde(rename = "committed")]
    Committed {
        #[serde(rename = "txId")]
        tx_id: String,
        function: String,
        height: u64,
    },
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/rpc", post(rpc_handler))
        .route("/ws", get(ws_handler))
        .route("/transactions/:id", get(transaction_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// JSON-RPC Types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version. Must be "2.0".
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
    /// Request identifier. Echoed back in the response.
    #[serde(default)]
    pub id: Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version. Always "2.0".
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<&ContractError> for JsonRpcError {
    fn from(err: &ContractError) -> Self {
        Self {
            code: error_code(err.kind()),
            message: err.to_string(),
            data: Some(json!({ "kind": err.kind().to_string(), "op": err.op() })),
        }
    }
}

/// Parameters of `cloister_submit` and `cloister_evaluate`.
///
/// No `Debug`: `transient` holds confidential bytes.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InvokeParams {
    pub function: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub identity: Option<ClientIdentity>,
    /// Field name to hex-encoded bytes.
    #[serde(default)]
    pub transient: BTreeMap<String, String>,
}

impl InvokeParams {
    /// Decode the transient map and build the invocation. Errors name the
    /// offending field, never its content.
    pub fn into_invocation(self) -> Result<(Invocation, Vec<String>), String> {
        let mut transient = TransientMap::new();
        for (field, encoded) in self.transient {
            let bytes = hex::decode(&encoded)
                .map_err(|_| format!("transient field {field} is not valid hex"))?;
            transient.insert(field, bytes);
        }

        let mut invocation = Invocation::new(self.function).transient(transient);
        if let Some(identity) = self.identity {
            invocation = invocation.identity(identity);
        }
        Ok((invocation, self.args))
    }
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    /// Organization hosting this peer.
    pub org_id: String,
    /// Partitions named in the collection config.
    pub collections: Vec<String>,
    /// Transactions committed to the ledger so far.
    pub committed_transactions: u64,
    /// RFC 3339 timestamp of the response.
    pub timestamp: String,
}

/// Result of `cloister_submit`. `tx_id` and `height` are absent when the
/// function only reads and nothing was committed.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    pub result: Value,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`. Liveness only.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// `GET /status`
async fn status_handler(State(state): State<AppState>) -> Response {
    let height = match state.peer.state().height() {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("failed to read ledger height: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "ledger unavailable");
        }
    };

    Json(StatusResponse {
        version: state.version.clone(),
        org_id: state.peer.org_id().to_string(),
        collections: state.peer.collections().names().map(String::from).collect(),
        committed_transactions: height,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
    .into_response()
}

/// `POST /rpc`: JSON-RPC 2.0 gateway.
///
/// The body is taken raw so that malformed JSON gets a `-32700` response
/// rather than an HTTP rejection.
async fn rpc_handler(State(state): State<AppState>, body: Bytes) -> Json<JsonRpcResponse> {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            return Json(JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::new(
                    PARSE_ERROR,
                    format!("Parse error at line {} column {}", e.line(), e.column()),
                ),
            ))
        }
    };
    let id = raw.get("id").cloned().unwrap_or(Value::Null);

    let req: JsonRpcRequest = match serde_json::from_value(raw) {
        Ok(r) => r,
        Err(_) => {
            return Json(JsonRpcResponse::failure(
                id,
                JsonRpcError::new(
                    INVALID_REQUEST,
                    "Invalid Request: expected {jsonrpc, method, params, id}",
                ),
            ))
        }
    };

    if req.jsonrpc != "2.0" {
        return Json(JsonRpcResponse::failure(
            req.id,
            JsonRpcError::new(INVALID_REQUEST, "Invalid Request: jsonrpc must be \"2.0\""),
        ));
    }

    let submit = match req.method.as_str() {
        METHOD_SUBMIT => true,
        METHOD_EVALUATE => false,
        other => {
            return Json(JsonRpcResponse::failure(
                req.id,
                JsonRpcError::new(METHOD_NOT_FOUND, format!("Method not found: {other}")),
            ))
        }
    };

    let params: InvokeParams = match req.params.map(serde_json::from_value).transpose() {
        Ok(Some(p)) => p,
        _ => {
            return Json(JsonRpcResponse::failure(
                req.id,
                JsonRpcError::new(
                    INVALID_PARAMS,
                    "Invalid params: expected {function, args?, identity?, transient?}",
                ),
            ))
        }
    };

    if !submit && Function::parse(&params.function).is_some_and(|f| !f.is_read_only()) {
        return Json(JsonRpcResponse::failure(
            req.id,
            JsonRpcError::new(
                INVALID_PARAMS,
                format!("{} writes to the ledger; use {METHOD_SUBMIT}", params.function),
            ),
        ));
    }

    let label = Function::parse(&params.function)
        .map(Function::name)
        .unwrap_or("unknown");
    state.metrics.invocations_total.with_label_values(&[label]).inc();

    let (invocation, args) = match params.into_invocation() {
        Ok(parts) => parts,
        Err(reason) => {
            return Json(JsonRpcResponse::failure(
                req.id,
                JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: {reason}")),
            ))
        }
    };

    match execute(&state, invocation, args).await {
        Ok(execution) if submit => {
            let record = execution.record.as_ref();
            let result = SubmitResult {
                tx_id: record.map(|r| r.tx_id.clone()),
                height: record.map(|r| r.height),
                result: execution.result,
            };
            match serde_json::to_value(result) {
                Ok(v) => Json(JsonRpcResponse::success(req.id, v)),
                Err(e) => Json(JsonRpcResponse::failure(
                    req.id,
                    JsonRpcError::new(INTERNAL_ERROR, format!("Internal error: {e}")),
                )),
            }
        }
        Ok(execution) => Json(JsonRpcResponse::success(req.id, execution.result)),
        Err(error) => Json(JsonRpcResponse::failure(req.id, error)),
    }
}

/// Run one invocation on the blocking pool, then record metrics and
/// announce the commit.
async fn execute(
    state: &AppState,
    invocation: Invocation,
    args: Vec<String>,
) -> Result<Execution, JsonRpcError> {
    let peer = state.peer.clone();
    let contract = state.contract;

    let timer = state.metrics.invocation_latency_seconds.start_timer();
    let outcome =
        tokio::task::spawn_blocking(move || contract.execute(&peer, invocation, &args)).await;
    timer.observe_duration();

    match outcome {
        Err(e) => {
            tracing::error!("invocation task failed: {}", e);
            Err(JsonRpcError::new(INTERNAL_ERROR, "Internal error"))
        }
        Ok(Err(err)) => {
            let kind = err.kind().to_string();
            state
                .metrics
                .failed_invocations_total
                .with_label_values(&[kind.as_str()])
                .inc();
            if err.is_mvcc_conflict() {
                state.metrics.mvcc_conflicts_total.inc();
            }
            tracing::warn!(op = err.op(), kind = %err.kind(), "invocation failed");
            Err(JsonRpcError::from(&err))
        }
        Ok(Ok(execution)) => {
            if let Some(record) = &execution.record {
                state.metrics.committed_transactions_total.inc();
                state.metrics.ledger_height.set(record.height as i64);
                // No subscribers is not an error.
                let _ = state.event_tx.send(NodeEvent::Committed {
                    tx_id: record.tx_id.clone(),
                    function: record.function.clone(),
                    height: record.height,
                });
                tracing::info!(
                    tx_id = %record.tx_id,
                    function = %record.function,
                    height = record.height,
                    "transaction committed"
                );
            }
            Ok(execution)
        }
    }
}

/// `GET /ws`: WebSocket upgrade for commit notifications.
///
/// Push-only. Client messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

/// `GET /transactions/:id`: the log record of a committed transaction.
/// Records carry value hashes only.
async fn transaction_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.peer.state().transaction(&id) {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("transaction {id} not found")),
        Err(e) => {
            tracing::error!(tx_id = %id, "failed to read transaction log: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "ledger unavailable")
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use cloister_protocol::storage::{
        CollectionConfig, MemoryWorldState, SledWorldState, TxRecord, WorldState,
    };
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    const PROPS: &str =
        r#"{"objectType":"asset","id":"asset1","color":"blue","size":10,"appraisedValue":100}"#;

    fn app_state_over(state: Arc<dyn WorldState>) -> AppState {
        let collections = Arc::new(CollectionConfig::for_orgs(&["Org1MSP", "Org2MSP"]).unwrap());
        let peer = Peer::new("Org1MSP", state, collections);
        AppState::new(peer, Arc::new(crate::metrics::NodeMetrics::new().unwrap()))
    }

    fn test_app_state() -> AppState {
        app_state_over(Arc::new(MemoryWorldState::new()))
    }

    fn alice() -> Value {
        json!({ "id": "x509::CN=alice::CN=ca.org1", "mspId": "Org1MSP" })
    }

    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    async fn post_raw(router: &Router, body: Vec<u8>) -> JsonRpcResponse {
        let req = Request::builder()
            .method("POST")
            .uri("/rpc")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    async fn rpc(router: &Router, method: &str, params: Value) -> JsonRpcResponse {
        let body = json!({ "jsonrpc": "2.0", "method": method, "params": params, "id": 1 });
        post_raw(router, serde_json::to_vec(&body).unwrap()).await
    }

    async fn create_asset(router: &Router) -> SubmitResult {
        let resp = rpc(
            router,
            METHOD_SUBMIT,
            json!({
                "function": "CreateAsset",
                "identity": alice(),
                "transient": { "asset_properties": hex::encode(PROPS) },
            }),
        )
        .await;
        assert!(resp.error.is_none(), "{:?}", resp.error);
        serde_json::from_value(resp.result.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn status_counts_commits() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/status").await;
        assert_eq!(status, StatusCode::OK);
        let resp: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.org_id, "Org1MSP");
        assert_eq!(resp.committed_transactions, 0);
        assert!(resp.collections.contains(&"assetCollection".to_string()));

        create_asset(&router).await;
        let (_, body) = get(&router, "/status").await;
        let resp: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.committed_transactions, 1);
    }

    #[tokio::test]
    async fn submit_then_evaluate() {
        let router = create_router(test_app_state());
        let submitted = create_asset(&router).await;
        assert_eq!(submitted.height, Some(1));
        assert!(submitted.tx_id.is_some());
        assert_eq!(submitted.result["owner"], alice()["id"]);

        let resp = rpc(
            &router,
            METHOD_EVALUATE,
            json!({ "function": "ReadAsset", "args": ["asset1"], "identity": alice() }),
        )
        .await;
        let asset = resp.result.unwrap();
        assert_eq!(asset["objectType"], "asset");
        assert_eq!(asset["color"], "blue");
    }

    #[tokio::test]
    async fn transaction_endpoint_returns_hashes_only() {
        let router = create_router(test_app_state());
        let submitted = create_asset(&router).await;
        let tx_id = submitted.tx_id.unwrap();

        let (status, body) = get(&router, &format!("/transactions/{tx_id}")).await;
        assert_eq!(status, StatusCode::OK);
        let record: TxRecord = serde_json::from_slice(&body).unwrap();
        assert_eq!(record.function, "CreateAsset");
        assert_eq!(record.writes.len(), 2);
        assert!(!String::from_utf8_lossy(&body).contains("appraisedValue"));

        let (status, body) = get(&router, "/transactions/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("not found"));
    }

    #[tokio::test]
    async fn commits_are_broadcast() {
        let state = test_app_state();
        let mut rx = state.event_tx.subscribe();
        let router = create_router(state);

        let submitted = create_asset(&router).await;
        let event = rx.try_recv().unwrap();
        assert_eq!(
            event,
            NodeEvent::Committed {
                tx_id: submitted.tx_id.unwrap(),
                function: "CreateAsset".into(),
                height: 1,
            }
        );
        let wire = serde_json::to_value(&event).unwrap();
        assert_eq!(wire["type"], "committed");
        assert!(wire.get("txId").is_some());
    }

    #[tokio::test]
    async fn evaluate_refuses_writing_functions() {
        let router = create_router(test_app_state());
        let resp = rpc(
            &router,
            METHOD_EVALUATE,
            json!({
                "function": "CreateAsset",
                "identity": alice(),
                "transient": { "asset_properties": hex::encode(PROPS) },
            }),
        )
        .await;
        assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);

        let (_, body) = get(&router, "/status").await;
        let status: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(status.committed_transactions, 0);
    }

    #[tokio::test]
    async fn contract_errors_map_to_server_codes() {
        let state = test_app_state();
        let metrics = Arc::clone(&state.metrics);
        let router = create_router(state);

        let resp = rpc(
            &router,
            METHOD_EVALUATE,
            json!({ "function": "ReadAsset", "args": ["ghost"], "identity": alice() }),
        )
        .await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, error_code(ErrorKind::NotFound));
        assert_eq!(err.data.unwrap()["kind"], "NotFoundError");
        assert_eq!(
            metrics
                .failed_invocations_total
                .with_label_values(&["NotFoundError"])
                .get(),
            1
        );

        let resp = rpc(&router, METHOD_EVALUATE, json!({ "function": "GetClientID" })).await;
        assert_eq!(resp.error.unwrap().code, error_code(ErrorKind::Identity));

        let resp = rpc(&router, METHOD_SUBMIT, json!({ "function": "Mint" })).await;
        assert_eq!(resp.error.unwrap().code, error_code(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn bad_envelopes_use_standard_codes() {
        let router = create_router(test_app_state());

        let resp = post_raw(&router, b"{not json".to_vec()).await;
        assert_eq!(resp.error.unwrap().code, PARSE_ERROR);

        let body = json!({ "jsonrpc": "1.0", "method": METHOD_SUBMIT, "id": 7 });
        let resp = post_raw(&router, serde_json::to_vec(&body).unwrap()).await;
        assert_eq!(resp.error.unwrap().code, INVALID_REQUEST);
        assert_eq!(resp.id, json!(7));

        let resp = rpc(&router, "cloister_mint", json!({})).await;
        assert_eq!(resp.error.unwrap().code, METHOD_NOT_FOUND);

        let resp = rpc(&router, METHOD_SUBMIT, json!({ "args": [] })).await;
        assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn transient_must_be_hex() {
        let router = create_router(test_app_state());
        let resp = rpc(
            &router,
            METHOD_SUBMIT,
            json!({
                "function": "CreateAsset",
                "identity": alice(),
                "transient": { "asset_properties": PROPS },
            }),
        )
        .await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, INVALID_PARAMS);
        assert!(err.message.contains("asset_properties"));
        assert!(!err.message.contains("appraisedValue"));
    }

    #[test]
    fn error_codes_are_distinct_server_codes() {
        let kinds = [
            ErrorKind::Validation,
            ErrorKind::Conflict,
            ErrorKind::NotFound,
            ErrorKind::Identity,
            ErrorKind::Authorization,
            ErrorKind::AgreementMismatch,
            ErrorKind::Decode,
            ErrorKind::Substrate,
        ];
        let codes: std::collections::HashSet<i32> = kinds.iter().map(|k| error_code(*k)).collect();
        assert_eq!(codes.len(), kinds.len());
        assert!(codes.iter().all(|c| (-32099..=-32000).contains(c)));
    }

    #[tokio::test]
    async fn sled_backed_log_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let tx_id = {
            let ledger = Arc::new(SledWorldState::open(dir.path()).unwrap());
            let router = create_router(app_state_over(ledger));
            create_asset(&router).await.tx_id.unwrap()
        };

        let ledger = Arc::new(SledWorldState::open(dir.path()).unwrap());
        let router = create_router(app_state_over(ledger));
        let (status, _) = get(&router, &format!("/transactions/{tx_id}")).await;
        assert_eq!(status, StatusCode::OK);
    }
}
