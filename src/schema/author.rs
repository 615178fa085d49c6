use super::{LoadMode, ResourceSchema};
use crate::error::{AppError, ValidationErrors};
use crate::model::{Author, AuthorFields, AUTHOR_NAME_MAX};
use crate::service::validation::MISSING;
use crate::service::{create_author, update_or_create_author, AuthorRef, FieldReader, StringRule};
use crate::store::Store;
use async_trait::async_trait;
use serde_json::Value;

const FIELDS: &[&str] = &["id", "first_name", "last_name"];
const NAME: StringRule = StringRule::required(Some(AUTHOR_NAME_MAX));
const NESTED_NAME: StringRule = StringRule::optional(Some(AUTHOR_NAME_MAX));

pub struct AuthorSchema;

/// Parse an author embedded in an article. Names are only required when no id is given.
pub(crate) fn parse_ref(value: Value) -> Result<AuthorRef, ValidationErrors> {
    let mut reader = FieldReader::new(value, FIELDS)?;
    if !reader.has("id") {
        for name in ["first_name", "last_name"] {
            if !reader.has(name) {
                reader.add(name, MISSING);
            }
        }
    }
    let id = reader.integer("id");
    let first_name = reader.string("first_name", NESTED_NAME);
    let last_name = reader.string("last_name", NESTED_NAME);
    reader.finish()?;
    Ok(AuthorRef {
        id,
        first_name,
        last_name,
    })
}

#[async_trait]
impl ResourceSchema for AuthorSchema {
    const ENTITY: &'static str = "Author";

    type Output = Author;

    async fn list(store: &dyn Store) -> Result<Vec<Author>, AppError> {
        store.list_authors().await
    }

    async fn fetch(store: &dyn Store, id: i32) -> Result<Option<Author>, AppError> {
        store.get_author(id).await
    }

    async fn load(store: &dyn Store, body: Value, mode: LoadMode) -> Result<Author, AppError> {
        let mut reader = FieldReader::new(body, FIELDS)?;
        let id = reader.integer("id");
        let first_name = reader.string("first_name", NAME);
        let last_name = reader.string("last_name", NAME);
        reader.finish()?;

        // Both names are present once the reader has finished cleanly.
        let fields = AuthorFields {
            first_name: first_name.unwrap_or_default(),
            last_name: last_name.unwrap_or_default(),
        };
        match mode {
            LoadMode::Create => create_author(store, id, &fields).await,
            LoadMode::Update => update_or_create_author(store, id, &fields).await,
        }
    }

    async fn remove(store: &dyn Store, id: i32) -> Result<bool, AppError> {
        store.delete_author(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AuthorRepository, MemoryStore};
    use serde_json::json;

    #[tokio::test]
    async fn create_requires_both_names() {
        let store = MemoryStore::new();
        let err = AuthorSchema::load(&store, json!({"first_name": "Test FN"}), LoadMode::Create)
            .await
            .unwrap_err();
        let AppError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({"last_name": ["Missing data for required field."]})
        );
    }

    #[tokio::test]
    async fn rejects_names_over_forty_characters() {
        let store = MemoryStore::new();
        let body = json!({"first_name": "x".repeat(41), "last_name": "ok"});
        let err = AuthorSchema::load(&store, body, LoadMode::Create).await.unwrap_err();
        let AppError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({"first_name": ["Longer than maximum length 40."]})
        );
    }

    #[tokio::test]
    async fn update_mode_overwrites_existing() {
        let store = MemoryStore::new();
        let created = AuthorSchema::load(
            &store,
            json!({"first_name": "A", "last_name": "B"}),
            LoadMode::Create,
        )
        .await
        .unwrap();
        let updated = AuthorSchema::load(
            &store,
            json!({"id": created.id, "first_name": "C", "last_name": "D"}),
            LoadMode::Update,
        )
        .await
        .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(store.list_authors().await.unwrap(), vec![updated]);
    }

    #[test]
    fn nested_ref_with_id_needs_no_names() {
        let reference = parse_ref(json!({"id": 3})).unwrap();
        assert_eq!(reference.id, Some(3));
        assert!(reference.first_name.is_none());
    }

    #[test]
    fn nested_ref_without_id_needs_names() {
        let errors = parse_ref(json!({"first_name": "FN"})).unwrap_err();
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({"last_name": ["Missing data for required field."]})
        );
    }
}
