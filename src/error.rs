//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Key used for errors that belong to the whole object rather than one field.
pub const SCHEMA_KEY: &str = "_schema";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("validation failed")]
    Validation(ValidationErrors),
    #[error("No {0} matches the given query.")]
    NotFound(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("id sequence for {0} is exhausted")]
    SequenceExhausted(&'static str),
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

/// Errors for one field: either messages, or the errors of a nested object or list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldError {
    Messages(Vec<String>),
    Nested(ValidationErrors),
}

/// Field-keyed validation errors, serialized as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Add a message to `field`. A field that already holds nested errors keeps them.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        match self
            .fields
            .entry(field.to_string())
            .or_insert_with(|| FieldError::Messages(Vec::new()))
        {
            FieldError::Messages(messages) => messages.push(message.into()),
            FieldError::Nested(nested) => nested.add(SCHEMA_KEY, message),
        }
    }

    pub fn nest(&mut self, field: &str, errors: ValidationErrors) {
        if !errors.is_empty() {
            self.fields.insert(field.to_string(), FieldError::Nested(errors));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.fields.get(field)
    }

    /// `Ok(())` when nothing was recorded, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => {
                tracing::warn!(errors = ?errors, "validation failed");
                (StatusCode::BAD_REQUEST, Json(errors)).into_response()
            }
            AppError::NotFound(_) => error_response(StatusCode::NOT_FOUND, self.to_string()),
            AppError::BadRequest(message) => {
                tracing::warn!(%message, "bad request");
                error_response(StatusCode::BAD_REQUEST, message)
            }
            AppError::Config(_) | AppError::Db(_) | AppError::SequenceExhausted(_) => {
                tracing::error!(error = %self, "request failed");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong processing this request.".into(),
                )
            }
        }
    }
}

pub fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorBody { error })).into_response()
}
