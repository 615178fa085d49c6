//! Validation, nested resolution and upserts, independent of the HTTP layer.

mod crud;
pub mod resolve;
pub mod validation;

pub use crud::{create_author, update_or_create_author, update_or_create_region};
pub use resolve::{resolve_author, resolve_region, resolve_regions, AuthorRef, RegionRef};
pub use validation::{FieldReader, StringRule};
