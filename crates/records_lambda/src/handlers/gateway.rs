use std::borrow::Cow;
use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use percent_encoding::percent_decode_str;
use records_core::http::{HttpRequest, HttpResponse};
use records_core::routing::route;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Instrument;

use crate::adapters::record_store::RecordStore;
use crate::handlers::records::RecordHandler;

pub const ROUTE_NOT_FOUND_MESSAGE: &str = "route not found";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    #[serde(rename = "isBase64Encoded")]
    pub is_base64_encoded: bool,
}

impl From<HttpResponse> for ApiGatewayResponse {
    fn from(response: HttpResponse) -> Self {
        Self {
            status_code: response.status,
            headers: response.headers,
            body: response.body,
            is_base64_encoded: false,
        }
    }
}

/// Bridges API Gateway invocations to the record handler.
///
/// Built once per process and shared by reference across invocations; it
/// holds no mutable state of its own.
pub struct Entrypoint<S> {
    handler: RecordHandler<S>,
    ignore_stage_in_path: bool,
}

impl<S: RecordStore> Entrypoint<S> {
    pub fn new(handler: RecordHandler<S>, ignore_stage_in_path: bool) -> Self {
        Self {
            handler,
            ignore_stage_in_path,
        }
    }

    pub fn handler(&self) -> &RecordHandler<S> {
        &self.handler
    }

    pub async fn handle_event(&self, event: Value) -> ApiGatewayResponse {
        let request = match normalize_apigw_event(&event, self.ignore_stage_in_path) {
            Ok(request) => request,
            Err(message) => {
                tracing::info!(message = %message, "rejected malformed gateway event");
                return HttpResponse::error(400, &message).into();
            }
        };

        let span = tracing::info_span!(
            "request",
            method = %request.method,
            path = %request.path,
            identity = request.identity.as_deref().unwrap_or("anonymous"),
        );
        self.handle_request(request).instrument(span).await.into()
    }

    pub async fn handle_request(&self, request: HttpRequest) -> HttpResponse {
        match route(&request.method, &request.path) {
            Ok(route) => self.handler.handle(route, &request).await,
            Err(error) => {
                tracing::info!(error = %error, "no matching route");
                HttpResponse::error(404, ROUTE_NOT_FOUND_MESSAGE)
            }
        }
    }
}

/// Reads either a REST API (v1) or HTTP API (v2) proxy event.
pub fn normalize_apigw_event(event: &Value, ignore_stage: bool) -> Result<HttpRequest, String> {
    let Some(object) = event.as_object() else {
        return Err("Request payload must be a JSON object".to_string());
    };
    let context = object.get("requestContext");

    let method = object
        .get("httpMethod")
        .and_then(Value::as_str)
        .or_else(|| lookup_str(context, &["http", "method"]))
        .ok_or_else(|| "Request is missing an HTTP method".to_string())?;

    let raw_path = match object.get("path").and_then(Value::as_str) {
        Some(path) => Cow::Borrowed(path),
        // HTTP API events carry the path still percent-encoded.
        None => {
            let encoded = object
                .get("rawPath")
                .and_then(Value::as_str)
                .ok_or_else(|| "Request is missing a path".to_string())?;
            percent_decode_str(encoded)
                .decode_utf8()
                .map_err(|_| "Request path must be UTF-8".to_string())?
        }
    };

    let path = match lookup_str(context, &["stage"]) {
        Some(stage) if ignore_stage => strip_stage(&raw_path, stage),
        _ => &*raw_path,
    };

    let mut request = HttpRequest::new(method.to_ascii_uppercase(), path);
    request.headers = string_map(object.get("headers"))
        .into_iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value))
        .collect();
    request.query = string_map(object.get("queryStringParameters"));
    request.body = decode_body(object)?;
    request.identity = caller_identity(context);
    Ok(request)
}

fn strip_stage<'a>(path: &'a str, stage: &str) -> &'a str {
    if stage.is_empty() || stage == "$default" {
        return path;
    }
    match path.strip_prefix('/').and_then(|rest| rest.strip_prefix(stage)) {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

fn decode_body(object: &serde_json::Map<String, Value>) -> Result<Option<String>, String> {
    let is_base64 = object
        .get("isBase64Encoded")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    match object.get("body") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if is_base64 => {
            let bytes = STANDARD
                .decode(text)
                .map_err(|error| format!("Malformed base64 body: {error}"))?;
            String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| "Request body must be UTF-8".to_string())
        }
        Some(Value::String(text)) => Ok(Some(text.clone())),
        // Direct invocations may pass the body as an already-parsed object.
        Some(body @ Value::Object(_)) => Ok(Some(body.to_string())),
        Some(_) => Err("Request body must be a string".to_string()),
    }
}

fn caller_identity(context: Option<&Value>) -> Option<String> {
    const CANDIDATES: &[&[&str]] = &[
        &["authorizer", "principalId"],
        &["authorizer", "claims", "sub"],
        &["authorizer", "jwt", "claims", "sub"],
        &["identity", "cognitoIdentityId"],
    ];

    CANDIDATES
        .iter()
        .find_map(|path| lookup_str(context, path).filter(|identity| !identity.is_empty()))
        .map(str::to_string)
}

fn lookup_str<'a>(root: Option<&'a Value>, path: &[&str]) -> Option<&'a str> {
    let mut current = root?;
    for segment in path {
        current = current.get(segment)?;
    }
    current.as_str()
}

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|fields| {
            fields
                .iter()
                .filter_map(|(name, value)| {
                    value.as_str().map(|text| (name.clone(), text.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}
