//! HTTP mapping of the [`Parser`] operations under `/api/v1`.
use std::future::Future;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::parser::Parser;
use crate::types::{BlockHeight, TransactionRecord};

/// Shared facade the handlers operate on.
pub type SharedParser = Arc<dyn Parser>;

const ADDRESS_REQUIRED: &str = "address is required";

/// Body of `GET /block/current`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockResponse {
    /// Last processed height.
    pub block: BlockHeight,
}

/// Body of `POST /subscribe`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscribeRequest {
    /// Address to watch.
    #[serde(default)]
    pub address: Option<String>,
}

/// Reply of `POST /subscribe`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeResponse {
    /// Outcome message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Validation error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Query of `GET /transactions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionsQuery {
    /// Address to list.
    pub address: Option<String>,
}

/// Reply of `GET /transactions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionsResponse {
    /// Matched transactions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<TransactionRecord>>,
    /// Validation error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Routes under `/api/v1`, with request tracing.
pub fn router(parser: SharedParser) -> Router {
    Router::new()
        .route("/api/v1/block/current", get(current_block))
        .route("/api/v1/subscribe", post(subscribe))
        .route("/api/v1/transactions", get(transactions))
        .layer(TraceLayer::new_for_http())
        .with_state(parser)
}

/// Serve [`router`] on `listener` until `shutdown` resolves, then drain
/// in-flight requests.
pub async fn serve<F>(listener: TcpListener, parser: SharedParser, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(parser))
        .with_graceful_shutdown(shutdown)
        .await
}

fn non_empty(address: Option<String>) -> Option<String> {
    address.filter(|a| !a.trim().is_empty())
}

async fn current_block(State(parser): State<SharedParser>) -> Json<BlockResponse> {
    Json(BlockResponse {
        block: parser.current_block().await,
    })
}

async fn subscribe(
    State(parser): State<SharedParser>,
    payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Response {
    let address = payload.ok().and_then(|Json(req)| non_empty(req.address));
    let Some(address) = address else {
        let body = SubscribeResponse {
            error: Some(ADDRESS_REQUIRED.into()),
            ..Default::default()
        };
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    };

    let (status, message) = if parser.subscribe(&address).await {
        (StatusCode::OK, "successfully subscribed")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "unable to subscribe")
    };
    let body = SubscribeResponse {
        message: Some(message.into()),
        ..Default::default()
    };
    (status, Json(body)).into_response()
}

async fn transactions(
    State(parser): State<SharedParser>,
    Query(query): Query<TransactionsQuery>,
) -> Response {
    let Some(address) = non_empty(query.address) else {
        let body = TransactionsResponse {
            error: Some(ADDRESS_REQUIRED.into()),
            ..Default::default()
        };
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    };

    let body = TransactionsResponse {
        data: Some(parser.transactions(&address).await),
        ..Default::default()
    };
    (StatusCode::OK, Json(body)).into_response()
}
