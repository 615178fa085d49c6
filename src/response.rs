//! Response helpers. Bodies are the serialized resource itself, without an envelope.

use axum::{http::StatusCode, Json};
use serde::Serialize;

pub fn ok<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(data))
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(data))
}

/// 200 with an empty body.
pub fn empty() -> StatusCode {
    StatusCode::OK
}
