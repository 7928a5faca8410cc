mod support;

use serde_json::json;
use support::{body, entrypoint, memory_store, rest_event};

#[tokio::test]
async fn create_then_read_returns_identical_body() {
    let entrypoint = entrypoint();

    let created = entrypoint
        .handle_event(rest_event("POST", "/records", Some(json!({"name": "a"}))))
        .await;
    assert_eq!(created.status_code, 201);
    let created_body = body(&created);
    let id = created_body["id"]
        .as_str()
        .expect("generated id should be a string")
        .to_string();
    assert!(!id.is_empty());
    assert_eq!(created_body["attributes"], json!({"name": "a"}));

    let read = entrypoint
        .handle_event(rest_event("GET", &format!("/records/{id}"), None))
        .await;
    assert_eq!(read.status_code, 200);
    assert_eq!(body(&read), created_body);
    assert_eq!(read.headers["Content-Type"], "application/json");
}

#[tokio::test]
async fn write_then_read_preserves_nested_attributes() {
    let entrypoint = entrypoint();
    let attributes = json!({
        "title": "launch",
        "count": 3,
        "ratio": 0.25,
        "active": true,
        "owner": null,
        "tags": ["a", "b"],
        "meta": {"depth": {"level": 2}}
    });
    let mut payload = attributes.clone();
    payload["id"] = json!("client-chosen");

    let created = entrypoint
        .handle_event(rest_event("POST", "/records", Some(payload)))
        .await;
    assert_eq!(created.status_code, 201);
    assert_eq!(body(&created)["id"], "client-chosen");

    let read = entrypoint
        .handle_event(rest_event("GET", "/records/client-chosen", None))
        .await;
    assert_eq!(body(&read)["attributes"], attributes);
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let entrypoint = entrypoint();

    let response = entrypoint
        .handle_event(rest_event("GET", "/records/unknown-id", None))
        .await;

    assert_eq!(response.status_code, 404);
    assert_eq!(body(&response), json!({"error": "not found"}));
}

#[tokio::test]
async fn delete_twice_yields_no_content_then_not_found() {
    let entrypoint = entrypoint();
    entrypoint
        .handle_event(rest_event("POST", "/records", Some(json!({"id": "d-1"}))))
        .await;

    let first = entrypoint
        .handle_event(rest_event("DELETE", "/records/d-1", None))
        .await;
    assert_eq!(first.status_code, 204);
    assert!(first.body.is_empty());

    let second = entrypoint
        .handle_event(rest_event("DELETE", "/records/d-1", None))
        .await;
    assert_eq!(second.status_code, 404);

    let read = entrypoint
        .handle_event(rest_event("GET", "/records/d-1", None))
        .await;
    assert_eq!(read.status_code, 404);
}

#[tokio::test]
async fn update_is_idempotent() {
    let entrypoint = entrypoint();
    entrypoint
        .handle_event(rest_event(
            "POST",
            "/records",
            Some(json!({"id": "u-1", "name": "old", "stale": true})),
        ))
        .await;

    let update = || rest_event("PUT", "/records/u-1", Some(json!({"name": "new"})));
    let first = entrypoint.handle_event(update()).await;
    let second = entrypoint.handle_event(update()).await;

    assert_eq!(first.status_code, 200);
    assert_eq!(first, second);
    assert_eq!(
        body(&second),
        json!({"id": "u-1", "attributes": {"name": "new"}})
    );

    let read = entrypoint
        .handle_event(rest_event("GET", "/records/u-1", None))
        .await;
    assert_eq!(body(&read), body(&second));
}

#[tokio::test]
async fn update_of_missing_record_is_not_found() {
    let entrypoint = entrypoint();

    let response = entrypoint
        .handle_event(rest_event("PUT", "/records/ghost", Some(json!({"a": 1}))))
        .await;

    assert_eq!(response.status_code, 404);
    assert!(memory_store(&entrypoint).is_empty().await);
}

#[tokio::test]
async fn update_cannot_change_the_id() {
    let entrypoint = entrypoint();
    entrypoint
        .handle_event(rest_event("POST", "/records", Some(json!({"id": "fixed"}))))
        .await;

    let response = entrypoint
        .handle_event(rest_event(
            "PUT",
            "/records/fixed",
            Some(json!({"id": "moved", "a": 1})),
        ))
        .await;

    assert_eq!(response.status_code, 400);
    assert_eq!(body(&response), json!({"error": "id cannot be changed"}));
}

#[tokio::test]
async fn malformed_json_is_rejected_before_the_store() {
    let entrypoint = entrypoint();
    let mut event = rest_event("POST", "/records", None);
    event["body"] = json!("{\"name\": ");

    let response = entrypoint.handle_event(event).await;

    assert_eq!(response.status_code, 400);
    assert!(body(&response)["error"]
        .as_str()
        .expect("error message")
        .starts_with("malformed JSON body"));
    assert_eq!(memory_store(&entrypoint).calls(), 0);
}

#[tokio::test]
async fn unmatched_routes_are_not_found() {
    let entrypoint = entrypoint();

    let response = entrypoint
        .handle_event(rest_event("DELETE", "/records", None))
        .await;

    assert_eq!(response.status_code, 404);
    assert_eq!(body(&response), json!({"error": "route not found"}));
    assert_eq!(memory_store(&entrypoint).calls(), 0);
}

#[tokio::test]
async fn store_unavailable_for_every_attempt_is_bad_gateway() {
    let entrypoint = entrypoint();
    memory_store(&entrypoint).fail_next(3);

    let response = entrypoint
        .handle_event(rest_event("GET", "/records/any", None))
        .await;

    assert_eq!(response.status_code, 502);
    assert_eq!(body(&response), json!({"error": "store unavailable"}));
    assert_eq!(memory_store(&entrypoint).calls(), 3);
}

#[tokio::test]
async fn store_recovering_within_attempts_succeeds() {
    let entrypoint = entrypoint();
    memory_store(&entrypoint).fail_next(2);

    let response = entrypoint
        .handle_event(rest_event("POST", "/records", Some(json!({"id": "r"}))))
        .await;

    assert_eq!(response.status_code, 201);
    assert_eq!(memory_store(&entrypoint).len().await, 1);
}

#[tokio::test]
async fn patch_updates_part_of_a_record() {
    let entrypoint = entrypoint();
    entrypoint
        .handle_event(rest_event(
            "POST",
            "/records",
            Some(json!({"id": "p", "title": "t", "draft": true})),
        ))
        .await;

    let response = entrypoint
        .handle_event(rest_event(
            "PATCH",
            "/records/p",
            Some(json!({"draft": null, "title": "final"})),
        ))
        .await;

    assert_eq!(response.status_code, 200);
    assert_eq!(
        body(&response),
        json!({"id": "p", "attributes": {"title": "final"}})
    );
}

#[tokio::test]
async fn malformed_envelope_is_a_client_error() {
    let entrypoint = entrypoint();

    let response = entrypoint.handle_event(json!("not an event")).await;

    assert_eq!(response.status_code, 400);
    assert_eq!(
        body(&response),
        json!({"error": "Request payload must be a JSON object"})
    );
}

#[tokio::test]
async fn oversized_patch_is_a_client_error() {
    let entrypoint = entrypoint();
    entrypoint
        .handle_event(rest_event("POST", "/records", Some(json!({"id": "p"}))))
        .await;

    let blob = "x".repeat(500 * 1024);
    let patched = entrypoint
        .handle_event(rest_event("PATCH", "/records/p", Some(json!({"blob": blob}))))
        .await;

    assert_eq!(patched.status_code, 400);
    let read = entrypoint
        .handle_event(rest_event("GET", "/records/p", None))
        .await;
    assert_eq!(body(&read), json!({"id": "p", "attributes": {}}));
}

#[tokio::test]
async fn patch_that_grows_record_past_limit_is_a_client_error() {
    let entrypoint = entrypoint();
    let half = "x".repeat(210 * 1024);
    entrypoint
        .handle_event(rest_event("POST", "/records", Some(json!({"id": "g", "one": half}))))
        .await;

    let patched = entrypoint
        .handle_event(rest_event("PATCH", "/records/g", Some(json!({"two": half}))))
        .await;

    assert_eq!(patched.status_code, 400);
    assert!(body(&patched)["error"]
        .as_str()
        .is_some_and(|message| message.starts_with("record exceeds")));
}

#[tokio::test]
async fn numbers_outside_the_storable_range_are_client_errors() {
    let entrypoint = entrypoint();

    let created = entrypoint
        .handle_event(rest_event("POST", "/records", Some(json!({"x": 1e200}))))
        .await;

    assert_eq!(created.status_code, 400);
    assert_eq!(memory_store(&entrypoint).calls(), 0);
}

#[tokio::test]
async fn http_api_paths_are_percent_decoded() {
    let entrypoint = entrypoint();
    let created = entrypoint
        .handle_event(rest_event("POST", "/records", Some(json!({"id": "a bü"}))))
        .await;
    assert_eq!(created.status_code, 201);

    let read = entrypoint
        .handle_event(json!({
            "version": "2.0",
            "rawPath": "/prod/records/a%20b%C3%BC",
            "requestContext": {"stage": "prod", "http": {"method": "GET"}}
        }))
        .await;

    assert_eq!(read.status_code, 200);
    assert_eq!(body(&read)["id"], "a bü");
}
