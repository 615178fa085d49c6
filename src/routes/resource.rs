//! Resource routes. Each resource is served with and without a trailing slash.

use crate::handlers::resource::{create, delete, list, read, update};
use crate::schema::{ArticleSchema, AuthorSchema, RegionSchema, ResourceSchema};
use crate::state::AppState;
use axum::{routing::get, Router};

/// `base` and `base/:id` for one schema.
pub fn resource_routes<S: ResourceSchema>(base: &str) -> Router<AppState> {
    let item = format!("{}/:id", base);
    Router::new()
        .route(base, get(list::<S>).post(create::<S>))
        .route(&format!("{}/", base), get(list::<S>).post(create::<S>))
        .route(&item, get(read::<S>).put(update::<S>).delete(delete::<S>))
        .route(
            &format!("{}/", item),
            get(read::<S>).put(update::<S>).delete(delete::<S>),
        )
}

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .merge(resource_routes::<ArticleSchema>("/articles"))
        .merge(resource_routes::<AuthorSchema>("/author"))
        .merge(resource_routes::<RegionSchema>("/regions"))
        .with_state(state)
}
