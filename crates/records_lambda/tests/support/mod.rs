#![allow(dead_code)]

use records_core::contract::PageLimits;
use records_core::retry::RetryPolicy;
use records_lambda::adapters::memory_store::InMemoryRecordStore;
use records_lambda::adapters::retrying::RetryingStore;
use records_lambda::handlers::gateway::{ApiGatewayResponse, Entrypoint};
use records_lambda::handlers::records::RecordHandler;
use serde_json::{json, Value};

pub type TestEntrypoint = Entrypoint<RetryingStore<InMemoryRecordStore>>;

pub fn entrypoint() -> TestEntrypoint {
    entrypoint_with(InMemoryRecordStore::new(), PageLimits::default())
}

pub fn entrypoint_with(store: InMemoryRecordStore, limits: PageLimits) -> TestEntrypoint {
    let store = RetryingStore::new(store, RetryPolicy::immediate(3));
    Entrypoint::new(RecordHandler::new(store, limits), true)
}

pub fn memory_store(entrypoint: &TestEntrypoint) -> &InMemoryRecordStore {
    entrypoint.handler().store().inner()
}

/// REST API proxy event as delivered by API Gateway.
pub fn rest_event(method: &str, path: &str, body: Option<Value>) -> Value {
    json!({
        "resource": "/{proxy+}",
        "httpMethod": method,
        "path": path,
        "headers": {"Content-Type": "application/json"},
        "queryStringParameters": null,
        "body": body.map(|value| value.to_string()),
        "isBase64Encoded": false,
        "requestContext": {"stage": "prod", "identity": {}}
    })
}

pub fn list_event(limit: Option<usize>, cursor: Option<&str>) -> Value {
    let mut query = serde_json::Map::new();
    if let Some(limit) = limit {
        query.insert("limit".to_string(), Value::String(limit.to_string()));
    }
    if let Some(cursor) = cursor {
        query.insert("cursor".to_string(), Value::String(cursor.to_string()));
    }

    let mut event = rest_event("GET", "/records", None);
    event["queryStringParameters"] = Value::Object(query);
    event
}

pub fn body(response: &ApiGatewayResponse) -> Value {
    serde_json::from_str(&response.body).expect("response body should be JSON")
}
