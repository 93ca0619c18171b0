#![cfg(feature = "http-api")]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use ethwatch::api::{router, SharedParser};
use ethwatch::{BlockHeight, Parser, TransactionRecord};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Parser stub that records subscriptions and serves canned transactions.
#[derive(Default)]
struct StubParser {
    subscribed: Mutex<Vec<String>>,
    reject_subscribe: bool,
}

fn record() -> TransactionRecord {
    TransactionRecord {
        hash: "0xt1".into(),
        from: "0xaaa".into(),
        to: "0xBbB".into(),
        value: "100000000000000000000".into(),
        block_number: "10".into(),
        timestamp: "1700000010".into(),
    }
}

#[async_trait]
impl Parser for StubParser {
    async fn current_block(&self) -> BlockHeight {
        42
    }
    async fn subscribe(&self, address: &str) -> bool {
        if self.reject_subscribe {
            return false;
        }
        self.subscribed.lock().unwrap().push(address.to_string());
        true
    }
    async fn transactions(&self, address: &str) -> Vec<TransactionRecord> {
        if address.eq_ignore_ascii_case("0xaaa") {
            vec![record()]
        } else {
            Vec::new()
        }
    }
    fn shutdown(&self) {}
}

async fn call(parser: SharedParser, req: Request<Body>) -> anyhow::Result<(StatusCode, Value)> {
    let resp = router(parser).oneshot(req).await?;
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

fn post_json(body: &str) -> Request<Body> {
    Request::post("/api/v1/subscribe")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn current_block_reports_cursor() -> anyhow::Result<()> {
    let parser: SharedParser = Arc::new(StubParser::default());
    let req = Request::get("/api/v1/block/current").body(Body::empty())?;
    let (status, body) = call(parser, req).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "block": 42 }));
    Ok(())
}

#[tokio::test]
async fn subscribe_accepts_address() -> anyhow::Result<()> {
    let stub = Arc::new(StubParser::default());
    let (status, body) = call(stub.clone(), post_json(r#"{"address":"0xAAA"}"#)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "successfully subscribed" }));
    assert_eq!(*stub.subscribed.lock().unwrap(), vec!["0xAAA".to_string()]);
    Ok(())
}

#[tokio::test]
async fn subscribe_rejects_missing_or_bad_input() -> anyhow::Result<()> {
    for body in [r#"{}"#, r#"{"address":""}"#, r#"{"address":"   "}"#, "not json", r#"{"address":5}"#] {
        let stub = Arc::new(StubParser::default());
        let (status, reply) = call(stub.clone(), post_json(body)).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body:?}");
        assert_eq!(reply, json!({ "error": "address is required" }));
        assert!(stub.subscribed.lock().unwrap().is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn subscribe_failure_is_500() -> anyhow::Result<()> {
    let parser: SharedParser = Arc::new(StubParser { reject_subscribe: true, ..Default::default() });
    let (status, body) = call(parser, post_json(r#"{"address":"0xaaa"}"#)).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "message": "unable to subscribe" }));
    Ok(())
}

#[tokio::test]
async fn transactions_lists_records_in_camel_case() -> anyhow::Result<()> {
    let parser: SharedParser = Arc::new(StubParser::default());
    let req = Request::get("/api/v1/transactions?address=0xAAA").body(Body::empty())?;
    let (status, body) = call(parser, req).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "data": [{
            "hash": "0xt1",
            "from": "0xaaa",
            "to": "0xBbB",
            "value": "100000000000000000000",
            "blockNumber": "10",
            "timestamp": "1700000010",
        }]})
    );
    Ok(())
}

#[tokio::test]
async fn transactions_for_unknown_address_is_empty_list() -> anyhow::Result<()> {
    let parser: SharedParser = Arc::new(StubParser::default());
    let req = Request::get("/api/v1/transactions?address=0xfff").body(Body::empty())?;
    let (status, body) = call(parser, req).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": [] }));
    Ok(())
}

#[tokio::test]
async fn transactions_without_address_is_400() -> anyhow::Result<()> {
    for uri in ["/api/v1/transactions", "/api/v1/transactions?address="] {
        let parser: SharedParser = Arc::new(StubParser::default());
        let (status, body) = call(parser, Request::get(uri).body(Body::empty())?).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "address is required" }));
    }
    Ok(())
}
