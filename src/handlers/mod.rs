//! HTTP handlers shared by every resource.

pub mod resource;
pub use resource::*;
