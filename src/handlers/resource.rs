//! Generic resource handlers: list, create, read, update, delete.
//! Each is instantiated per entity with a [`ResourceSchema`], e.g. `list::<ArticleSchema>`.

use crate::error::{error_response, AppError};
use crate::response::{created, empty, ok};
use crate::schema::{LoadMode, ResourceSchema};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use serde_json::Value;

/// Path ids that are not integers never match an entity.
fn parse_id<S: ResourceSchema>(id_str: &str) -> Result<i32, AppError> {
    id_str.parse().map_err(|_| AppError::NotFound(S::ENTITY))
}

/// An empty body reads as `{}`.
fn parse_body(body: &Bytes) -> Result<Value, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Malformed JSON body: {}", e)))
}

pub async fn list<S: ResourceSchema>(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Vec<S::Output>>), AppError> {
    let items = S::list(state.store.as_ref()).await?;
    tracing::debug!(entity = S::ENTITY, count = items.len(), "list");
    Ok(ok(items))
}

pub async fn create<S: ResourceSchema>(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<S::Output>), AppError> {
    let body = parse_body(&body)?;
    let item = S::load(state.store.as_ref(), body, LoadMode::Create).await?;
    Ok(created(item))
}

pub async fn read<S: ResourceSchema>(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<(StatusCode, Json<S::Output>), AppError> {
    let id = parse_id::<S>(&id_str)?;
    let item = S::fetch(state.store.as_ref(), id)
        .await?
        .ok_or(AppError::NotFound(S::ENTITY))?;
    Ok(ok(item))
}

/// The path id replaces any id in the body.
pub async fn update<S: ResourceSchema>(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<S::Output>), AppError> {
    let id = parse_id::<S>(&id_str)?;
    let store = state.store.as_ref();
    if S::fetch(store, id).await?.is_none() {
        return Err(AppError::NotFound(S::ENTITY));
    }
    let body = match parse_body(&body)? {
        Value::Object(mut fields) => {
            fields.insert("id".into(), Value::from(id));
            Value::Object(fields)
        }
        other => other,
    };
    let item = S::load(store, body, LoadMode::Update).await?;
    tracing::info!(entity = S::ENTITY, id, "updated");
    Ok(ok(item))
}

pub async fn delete<S: ResourceSchema>(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id::<S>(&id_str)?;
    if !S::remove(state.store.as_ref(), id).await? {
        return Err(AppError::NotFound(S::ENTITY));
    }
    tracing::info!(entity = S::ENTITY, id, "deleted");
    Ok(empty())
}

/// Any path no route matched.
pub async fn fallback() -> Response {
    error_response(StatusCode::NOT_FOUND, "Invalid endpoint.".into())
}
