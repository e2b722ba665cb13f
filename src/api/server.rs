use crate::FlowError;
use crate::config::Config;
use crate::custodian::KeyCustodian;
use crate::flows::{FundFlow, PendingReconciler, RelayFlow};
use crate::registry::NetworkRegistry;
use crate::store::{NonceAllocator, TransactionLedger};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

/// Default lookback for `/checkPending` when the body omits `age`:
/// one year.
const DEFAULT_PENDING_AGE_SECS: u64 = 365 * 24 * 60 * 60;

/// Shared application state injected into every request handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<NetworkRegistry>,
    pub custodian: Arc<KeyCustodian>,
    pub nonces: NonceAllocator,
    pub ledger: TransactionLedger,
}

/// The HTTP server exposing the relay operations.
pub struct Server {
    config: Config,
    state: AppState,
}

impl Server {
    pub fn new(config: Config, state: AppState) -> Self {
        Self { config, state }
    }

    /// Bind to the configured address and serve requests until shutdown.
    pub async fn start(self) -> anyhow::Result<()> {
        let app = Router::new()
            .route("/fund", post(handle_fund))
            .route("/relay", post(handle_relay))
            .route("/checkPending", post(handle_check_pending))
            .with_state(self.state);

        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);
        info!("API server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// `POST /fund` request body.
#[derive(Debug, Deserialize)]
struct FundRequest {
    tx: Option<String>,
    blockchain: Option<String>,
}

/// `POST /relay` request body. `jsonRpcReponse` (sic) is the field name
/// existing clients send; changing the spelling would break them.
#[derive(Debug, Deserialize)]
struct RelayRequest {
    #[serde(rename = "metaSignedTx")]
    meta_signed_tx: Option<String>,
    blockchain: Option<String>,
    #[serde(rename = "jsonRpcReponse")]
    json_rpc_response: Option<bool>,
    id: Option<Value>,
}

/// `POST /checkPending` request body.
#[derive(Debug, Deserialize)]
struct CheckPendingRequest {
    blockchain: Option<String>,
    age: Option<u64>,
}

fn status_for(err: &FlowError) -> StatusCode {
    match err {
        FlowError::Validation(_) => StatusCode::BAD_REQUEST,
        FlowError::PolicyRejection(_) => StatusCode::TOO_MANY_REQUESTS,
        FlowError::AuthFailure => StatusCode::FORBIDDEN,
        FlowError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn success(data: Value) -> Response {
    (
        StatusCode::OK,
        Json(json!({ "status": "success", "data": data })),
    )
        .into_response()
}

fn failure(err: &FlowError) -> Response {
    (
        status_for(err),
        Json(json!({ "status": "error", "message": err.to_string() })),
    )
        .into_response()
}

/// Resolve a `blockchain` body field to a registered network.
fn lookup_network<'a>(
    state: &'a AppState,
    blockchain: &Option<String>,
) -> Result<&'a crate::registry::NetworkHandle, FlowError> {
    let name = blockchain
        .as_deref()
        .ok_or_else(|| FlowError::Validation("blockchain parameter missing".to_string()))?;
    state
        .registry
        .get(name)
        .ok_or_else(|| FlowError::Validation(format!("unknown blockchain: {name}")))
}

async fn handle_fund(State(state): State<AppState>, Json(body): Json<FundRequest>) -> Response {
    let result = fund(&state, &body).await;
    match result {
        Ok(tx_hash) => success(json!(format!("{tx_hash:?}"))),
        Err(err) => failure(&err),
    }
}

async fn fund(state: &AppState, body: &FundRequest) -> Result<ethers::types::H256, FlowError> {
    let tx_hex = body
        .tx
        .as_deref()
        .ok_or_else(|| FlowError::Validation("tx parameter missing".to_string()))?;
    let network = lookup_network(state, &body.blockchain)?;

    let flow = FundFlow::new(
        network.client.clone(),
        state.custodian.clone(),
        state.nonces.clone(),
        state.ledger.clone(),
    );
    flow.execute(tx_hex).await
}

async fn handle_relay(State(state): State<AppState>, Json(body): Json<RelayRequest>) -> Response {
    let result = relay(&state, &body).await;
    let as_json_rpc = body.json_rpc_response.unwrap_or(false);

    match result {
        Ok(tx_hash) => {
            let hash = format!("{tx_hash:?}");
            if as_json_rpc {
                (
                    StatusCode::OK,
                    Json(json!({
                        "id": body.id,
                        "jsonrpc": "2.0",
                        "result": hash,
                    })),
                )
                    .into_response()
            } else {
                success(json!(hash))
            }
        }
        Err(err) => {
            if as_json_rpc {
                (
                    status_for(&err),
                    Json(json!({
                        "id": body.id,
                        "jsonrpc": "2.0",
                        "error": { "code": -32600, "message": err.to_string() },
                    })),
                )
                    .into_response()
            } else {
                failure(&err)
            }
        }
    }
}

async fn relay(state: &AppState, body: &RelayRequest) -> Result<ethers::types::H256, FlowError> {
    let meta_signed_tx = body
        .meta_signed_tx
        .as_deref()
        .ok_or_else(|| FlowError::Validation("metaSignedTx parameter missing".to_string()))?;
    let network = lookup_network(state, &body.blockchain)?;

    let flow = RelayFlow::new(
        network.client.clone(),
        state.custodian.clone(),
        state.nonces.clone(),
        state.ledger.clone(),
    );
    flow.execute(meta_signed_tx).await
}

async fn handle_check_pending(
    State(state): State<AppState>,
    Json(body): Json<CheckPendingRequest>,
) -> Response {
    let network = match lookup_network(&state, &body.blockchain) {
        Ok(network) => network,
        Err(err) => return failure(&err),
    };
    let age = body.age.unwrap_or(DEFAULT_PENDING_AGE_SECS);

    let reconciler = PendingReconciler::new(network.client.clone(), state.ledger.clone());
    match reconciler.execute(age).await {
        Ok(report) => success(json!({
            "checked": report.checked,
            "updated": report.updated,
        })),
        Err(err) => failure(&err),
    }
}
