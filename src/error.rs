//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("cannot detect database dialect from url scheme '{0}'")]
    UnknownDialect(String),
}

/// Generation-time failures. Any of these aborts the pass; nothing is published.
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("schema unavailable: {0}")]
    SchemaUnavailable(String),
    #[error("{feature} is not supported by the {dialect} catalog driver")]
    UnsupportedDialectFeature {
        feature: &'static str,
        dialect: &'static str,
    },
    #[error("table '{table}' has no primary key; cannot build the {operation} route")]
    RouteKeyResolution { table: String, operation: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("artifact: {0}")]
    Artifact(String),
}

impl From<sqlx::Error> for GeneratorError {
    fn from(e: sqlx::Error) -> Self {
        GeneratorError::SchemaUnavailable(e.to_string())
    }
}

impl From<std::io::Error> for GeneratorError {
    fn from(e: std::io::Error) -> Self {
        GeneratorError::Artifact(e.to_string())
    }
}

impl From<serde_json::Error> for GeneratorError {
    fn from(e: serde_json::Error) -> Self {
        GeneratorError::Artifact(e.to_string())
    }
}

/// Request-time failures. Scoped to one request; never touch the shared snapshot.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Endpoint disabled")]
    OperationDisabled,
    #[error("Invalid filter parameter: '{0}'")]
    InvalidFilterField(String),
    #[error("validation failed")]
    ValidationFailed(BTreeMap<String, String>),
    #[error("Record not found")]
    RecordNotFound,
    #[error("API endpoint not found.")]
    RouteNotFound,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    ConstraintViolation(String),
    #[error("Database error occurred. Please check your input data and try again.")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        crate::service::translate_db_error(e)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::OperationDisabled => StatusCode::FORBIDDEN,
            AppError::RecordNotFound | AppError::RouteNotFound => StatusCode::NOT_FOUND,
            AppError::InvalidFilterField(_)
            | AppError::ValidationFailed(_)
            | AppError::BadRequest(_)
            | AppError::ConstraintViolation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn messages(&self) -> BTreeMap<String, String> {
        match self {
            AppError::ValidationFailed(fields) => fields.clone(),
            other => BTreeMap::from([("error".to_string(), other.to_string())]),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub error: u16,
    pub messages: BTreeMap<String, String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let AppError::Database(e) = &self {
            tracing::error!(error = %e, "untranslated database error");
        }
        let body = ErrorBody {
            status: status.as_u16(),
            error: status.as_u16(),
            messages: self.messages(),
        };
        (status, Json(body)).into_response()
    }
}
