use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Failure of an external geocoding or routing lookup.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("timed out after {0} ms")]
    Timeout(u64),
    #[error("service returned no usable result: {0}")]
    Empty(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("cannot read station list {path}: {source}")]
    StationsIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse station list {path}: {source}")]
    StationsJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("location not found: {0}")]
    LocationNotFound(String),
    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::LocationNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
