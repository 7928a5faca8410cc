//! Transport-neutral request and response shapes.
//!
//! The Lambda entrypoint converts gateway envelopes into these and back, so
//! routing and handling never see the platform's event format.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    /// Header names are lower-cased.
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: Option<String>,
    /// Caller identity asserted by the gateway authorizer, if any.
    pub identity: Option<String>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn json(status: u16, payload: impl Serialize) -> Self {
        Self {
            status,
            headers: json_headers(),
            body: serde_json::to_string(&payload).expect("response payload should serialize"),
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, json!({ "error": message }))
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            headers: BTreeMap::new(),
            body: String::new(),
        }
    }
}

fn json_headers() -> BTreeMap<String, String> {
    BTreeMap::from([("Content-Type".to_string(), "application/json".to_string())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_is_structured_json() {
        let response = HttpResponse::error(404, "not found");

        assert_eq!(response.status, 404);
        assert_eq!(response.body, r#"{"error":"not found"}"#);
        assert_eq!(response.headers["Content-Type"], "application/json");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut request = HttpRequest::new("GET", "/records");
        request
            .headers
            .insert("content-type".to_string(), "application/json".to_string());

        assert_eq!(request.header("Content-Type"), Some("application/json"));
    }
}
