use records_core::contract::{
    parse_create, parse_list_query, parse_patch, parse_update, validate_id, ListResponse,
    PageLimits, ValidationError,
};
use records_core::http::{HttpRequest, HttpResponse};
use records_core::routing::Route;
use thiserror::Error;

use crate::adapters::record_store::{RecordStore, StoreError};

pub const NOT_FOUND_MESSAGE: &str = "not found";
pub const ALREADY_EXISTS_MESSAGE: &str = "record already exists";
pub const STORE_UNAVAILABLE_MESSAGE: &str = "store unavailable";
pub const INTERNAL_ERROR_MESSAGE: &str = "internal error";

/// Terminal failure states of a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// Caller's fault; the message is returned verbatim.
    #[error("{message}")]
    Client { status: u16, message: String },

    /// Infrastructure fault; the cause is logged but never returned.
    #[error("{cause}")]
    Server { status: u16, cause: String },
}

impl HandlerError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Client {
            status: 400,
            message: message.into(),
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::Client { status, .. } | Self::Server { status, .. } => *status,
        }
    }

    pub fn into_response(self) -> HttpResponse {
        match self {
            Self::Client { status, message } => HttpResponse::error(status, &message),
            Self::Server { status: 502, .. } => {
                HttpResponse::error(502, STORE_UNAVAILABLE_MESSAGE)
            }
            Self::Server { status, .. } => HttpResponse::error(status, INTERNAL_ERROR_MESSAGE),
        }
    }
}

impl From<ValidationError> for HandlerError {
    fn from(error: ValidationError) -> Self {
        Self::bad_request(error.message())
    }
}

impl From<StoreError> for HandlerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => Self::Client {
                status: 404,
                message: NOT_FOUND_MESSAGE.to_string(),
            },
            StoreError::AlreadyExists => Self::bad_request(ALREADY_EXISTS_MESSAGE),
            StoreError::Invalid(message) => Self::bad_request(message),
            StoreError::Unavailable(_) => Self::Server {
                status: 502,
                cause: error.to_string(),
            },
            StoreError::Rejected(_) | StoreError::Corrupt(_) => Self::Server {
                status: 500,
                cause: error.to_string(),
            },
        }
    }
}

type IdGenerator = Box<dyn Fn() -> String + Send + Sync>;

/// Validates requests, performs the single store call each route needs, and
/// shapes the result into a response.
pub struct RecordHandler<S> {
    store: S,
    page_limits: PageLimits,
    generate_id: IdGenerator,
}

impl<S: RecordStore> RecordHandler<S> {
    pub fn new(store: S, page_limits: PageLimits) -> Self {
        Self {
            store,
            page_limits,
            generate_id: Box::new(|| uuid::Uuid::new_v4().to_string()),
        }
    }

    pub fn with_id_generator(
        mut self,
        generate_id: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        self.generate_id = Box::new(generate_id);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn handle(&self, route: Route, request: &HttpRequest) -> HttpResponse {
        let operation = route.operation();
        tracing::debug!(operation, "handling record operation");

        match self.execute(route, request).await {
            Ok(response) => response,
            Err(error) => {
                match &error {
                    HandlerError::Client { status, message } => {
                        tracing::info!(operation, status, message = %message, "client error");
                    }
                    HandlerError::Server { status, cause } => {
                        tracing::error!(operation, status, cause = %cause, "server error");
                    }
                }
                error.into_response()
            }
        }
    }

    async fn execute(
        &self,
        route: Route,
        request: &HttpRequest,
    ) -> Result<HttpResponse, HandlerError> {
        let body = request.body.as_deref();
        match route {
            Route::Create => {
                let record = parse_create(body, || (self.generate_id)())?;
                let stored = self.store.insert(record).await?;
                Ok(HttpResponse::json(201, stored))
            }
            Route::Read(id) => {
                validate_id(&id)?;
                let record = self.store.get(&id).await?;
                Ok(HttpResponse::json(200, record))
            }
            Route::Update(id) => {
                let record = parse_update(&id, body)?;
                let stored = self.store.replace(record).await?;
                Ok(HttpResponse::json(200, stored))
            }
            Route::Patch(id) => {
                let patch = parse_patch(&id, body)?;
                let merged = self.store.merge(&id, patch).await?;
                Ok(HttpResponse::json(200, merged))
            }
            Route::Delete(id) => {
                validate_id(&id)?;
                self.store.delete(&id).await?;
                Ok(HttpResponse::no_content())
            }
            Route::List => {
                let query = parse_list_query(&request.query, self.page_limits)?;
                let page = self.store.list(query.limit, query.cursor.as_ref()).await?;
                Ok(HttpResponse::json(
                    200,
                    ListResponse {
                        records: page.records,
                        next_cursor: page.next_cursor.map(|cursor| cursor.encode()),
                    },
                ))
            }
        }
    }
}
