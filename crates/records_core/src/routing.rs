use thiserror::Error;

pub const COLLECTION_PATH: &str = "/records";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Create,
    Read(String),
    Update(String),
    Patch(String),
    Delete(String),
    List,
}

impl Route {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read(_) => "read",
            Self::Update(_) => "update",
            Self::Patch(_) => "patch",
            Self::Delete(_) => "delete",
            Self::List => "list",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no route for {method} {path}")]
pub struct RouteNotFound {
    pub method: String,
    pub path: String,
}

/// Maps an HTTP method and path onto a record operation.
pub fn route(method: &str, path: &str) -> Result<Route, RouteNotFound> {
    let not_found = || RouteNotFound {
        method: method.to_string(),
        path: path.to_string(),
    };

    let trimmed = path.trim_end_matches('/');
    let Some(rest) = trimmed.strip_prefix(COLLECTION_PATH) else {
        return Err(not_found());
    };

    let method = method.to_ascii_uppercase();
    if rest.is_empty() {
        return match method.as_str() {
            "POST" => Ok(Route::Create),
            "GET" => Ok(Route::List),
            _ => Err(not_found()),
        };
    }

    let Some(id) = rest.strip_prefix('/') else {
        return Err(not_found());
    };
    if id.is_empty() || id.contains('/') {
        return Err(not_found());
    }

    let id = id.to_string();
    match method.as_str() {
        "GET" => Ok(Route::Read(id)),
        "PUT" => Ok(Route::Update(id)),
        "PATCH" => Ok(Route::Patch(id)),
        "DELETE" => Ok(Route::Delete(id)),
        _ => Err(not_found()),
    }
}
