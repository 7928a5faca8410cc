use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CURSOR_SCHEMA_VERSION: u8 = 1;

/// Opaque pagination position: the id of the last record on the previous page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    last_id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("cursor is not valid base64")]
    Encoding,
    #[error("cursor payload is malformed")]
    Payload,
    #[error("unsupported cursor version {0}")]
    Version(u8),
}

#[derive(Serialize, Deserialize)]
struct CursorPayload {
    v: u8,
    id: String,
}

impl Cursor {
    pub fn after(last_id: impl Into<String>) -> Self {
        Self {
            last_id: last_id.into(),
        }
    }

    pub fn last_id(&self) -> &str {
        &self.last_id
    }

    pub fn encode(&self) -> String {
        let payload = CursorPayload {
            v: CURSOR_SCHEMA_VERSION,
            id: self.last_id.clone(),
        };
        let json = serde_json::to_vec(&payload).expect("cursor payload should serialize");
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(token: &str) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| CursorError::Encoding)?;
        let payload: CursorPayload =
            serde_json::from_slice(&bytes).map_err(|_| CursorError::Payload)?;
        if payload.v != CURSOR_SCHEMA_VERSION {
            return Err(CursorError::Version(payload.v));
        }
        if payload.id.is_empty() {
            return Err(CursorError::Payload);
        }
        Ok(Self::after(payload.id))
    }
}
