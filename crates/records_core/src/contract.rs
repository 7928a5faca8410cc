use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::cursor::Cursor;
use crate::record::{AttributeValue, Attributes, Record, ID_ATTRIBUTE};

pub const MAX_ID_BYTES: usize = 255;
pub const MAX_RECORD_BYTES: usize = 400 * 1024;
pub const MAX_ATTRIBUTE_DEPTH: usize = 32;
/// Non-zero numbers must have a magnitude in `[MIN_NUMBER_MAGNITUDE, MAX_NUMBER_MAGNITUDE)`.
pub const MAX_NUMBER_MAGNITUDE: f64 = 1e126;
pub const MIN_NUMBER_MAGNITUDE: f64 = 1e-130;
pub const DEFAULT_PAGE_LIMIT: usize = 25;
pub const DEFAULT_MAX_PAGE_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
            max_limit: DEFAULT_MAX_PAGE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: usize,
    pub cursor: Option<Cursor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListResponse {
    pub records: Vec<Record>,
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::new("id cannot be empty"));
    }
    if id.len() > MAX_ID_BYTES {
        return Err(ValidationError::new(format!(
            "id exceeds {MAX_ID_BYTES} bytes"
        )));
    }
    if id.contains('/') {
        return Err(ValidationError::new("id cannot contain '/'"));
    }
    Ok(())
}

/// Builds the record for a create request. The body's `id` field, when
/// present, becomes the record id; otherwise `generate_id` supplies one.
pub fn parse_create(
    body: Option<&str>,
    generate_id: impl FnOnce() -> String,
) -> Result<Record, ValidationError> {
    let mut fields = parse_object_body(body)?;
    let id = match fields.remove(ID_ATTRIBUTE) {
        Some(Value::String(id)) => id,
        Some(_) => return Err(ValidationError::new("id must be a string")),
        None => generate_id(),
    };
    validate_id(&id)?;

    let record = Record::new(id, into_attributes(fields));
    validate_record(&record)?;
    Ok(record)
}

/// Builds the full replacement record for an update request.
pub fn parse_update(id: &str, body: Option<&str>) -> Result<Record, ValidationError> {
    validate_id(id)?;
    let mut fields = parse_object_body(body)?;
    match fields.remove(ID_ATTRIBUTE) {
        None => {}
        Some(Value::String(body_id)) if body_id == id => {}
        Some(_) => return Err(ValidationError::new("id cannot be changed")),
    }

    let record = Record::new(id, into_attributes(fields));
    validate_record(&record)?;
    Ok(record)
}

/// Parses a partial update. Null values mark keys for removal.
/// The merged result is size-checked by the store.
pub fn parse_patch(id: &str, body: Option<&str>) -> Result<Attributes, ValidationError> {
    validate_id(id)?;
    let fields = parse_object_body(body)?;
    if fields.contains_key(ID_ATTRIBUTE) {
        return Err(ValidationError::new("id cannot be changed"));
    }

    let patch = Record::new(id, into_attributes(fields));
    validate_record(&patch)?;
    Ok(patch.attributes)
}

pub fn parse_list_query(
    query: &BTreeMap<String, String>,
    limits: PageLimits,
) -> Result<ListQuery, ValidationError> {
    let limit = match query.get("limit").map(|value| value.trim()) {
        None | Some("") => limits.default_limit,
        Some(raw) => {
            let limit = raw
                .parse::<usize>()
                .map_err(|_| ValidationError::new("limit must be a positive integer"))?;
            if limit == 0 {
                return Err(ValidationError::new("limit must be a positive integer"));
            }
            if limit > limits.max_limit {
                return Err(ValidationError::new(format!(
                    "limit cannot exceed {}",
                    limits.max_limit
                )));
            }
            limit
        }
    };

    let cursor = match query.get("cursor").map(|value| value.trim()) {
        None | Some("") => None,
        Some(token) => Some(
            Cursor::decode(token)
                .map_err(|error| ValidationError::new(format!("invalid cursor: {error}")))?,
        ),
    };

    Ok(ListQuery { limit, cursor })
}

/// Checks the merged record still fits the store's item limits.
pub fn validate_record(record: &Record) -> Result<(), ValidationError> {
    validate_attributes(&record.attributes)?;
    let size = serde_json::to_vec(record)
        .map(|bytes| bytes.len())
        .unwrap_or(usize::MAX);
    if size > MAX_RECORD_BYTES {
        return Err(ValidationError::new(format!(
            "record exceeds {MAX_RECORD_BYTES} bytes"
        )));
    }
    Ok(())
}

fn validate_attributes(attributes: &Attributes) -> Result<(), ValidationError> {
    for (name, value) in attributes {
        if name.is_empty() {
            return Err(ValidationError::new("attribute names must be non-empty"));
        }
        if value.depth() > MAX_ATTRIBUTE_DEPTH {
            return Err(ValidationError::new(format!(
                "attribute '{name}' nests deeper than {MAX_ATTRIBUTE_DEPTH} levels"
            )));
        }
        if let Some(number) = out_of_range_number(value) {
            return Err(ValidationError::new(format!(
                "attribute '{name}' holds number {number} outside the storable range"
            )));
        }
    }
    Ok(())
}

fn out_of_range_number(value: &AttributeValue) -> Option<&Number> {
    match value {
        AttributeValue::Number(number) => {
            let magnitude = number.as_f64().map(f64::abs).unwrap_or(0.0);
            let storable = magnitude == 0.0
                || (MIN_NUMBER_MAGNITUDE..MAX_NUMBER_MAGNITUDE).contains(&magnitude);
            (!storable).then_some(number)
        }
        AttributeValue::List(values) => values.iter().find_map(out_of_range_number),
        AttributeValue::Map(fields) => fields.values().find_map(out_of_range_number),
        _ => None,
    }
}

fn parse_object_body(body: Option<&str>) -> Result<Map<String, Value>, ValidationError> {
    let Some(text) = body.filter(|text| !text.trim().is_empty()) else {
        return Err(ValidationError::new("request body is required"));
    };

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(ValidationError::new("request body must be a JSON object")),
        Err(error) => Err(ValidationError::new(format!("malformed JSON body: {error}"))),
    }
}

fn into_attributes(fields: Map<String, Value>) -> Attributes {
    fields
        .into_iter()
        .map(|(name, value)| (name, AttributeValue::from(value)))
        .collect()
}
