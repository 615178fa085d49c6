use super::{LoadMode, ResourceSchema};
use crate::error::{AppError, ValidationErrors};
use crate::model::{Region, RegionFields, REGION_CODE_MAX, REGION_NAME_MAX};
use crate::service::{update_or_create_region, FieldReader, RegionRef, StringRule};
use crate::store::Store;
use async_trait::async_trait;
use serde_json::Value;

const FIELDS: &[&str] = &["id", "code", "name"];

pub struct RegionSchema;

/// Parse a region embedded in an article. Every field is optional there.
pub(crate) fn parse_ref(value: Value) -> Result<RegionRef, ValidationErrors> {
    let mut reader = FieldReader::new(value, FIELDS)?;
    let id = reader.integer("id");
    let code = reader.string("code", StringRule::optional(Some(REGION_CODE_MAX)));
    let name = reader.string("name", StringRule::optional(Some(REGION_NAME_MAX)));
    reader.finish()?;
    Ok(RegionRef { id, code, name })
}

#[async_trait]
impl ResourceSchema for RegionSchema {
    const ENTITY: &'static str = "Region";

    type Output = Region;

    async fn list(store: &dyn Store) -> Result<Vec<Region>, AppError> {
        store.list_regions().await
    }

    async fn fetch(store: &dyn Store, id: i32) -> Result<Option<Region>, AppError> {
        store.get_region(id).await
    }

    async fn load(store: &dyn Store, body: Value, _mode: LoadMode) -> Result<Region, AppError> {
        let mut reader = FieldReader::new(body, FIELDS)?;
        let id = reader.integer("id");
        let code = reader.string("code", StringRule::required(Some(REGION_CODE_MAX)));
        let name = reader.string("name", StringRule::required(Some(REGION_NAME_MAX)));
        reader.finish()?;

        let fields = RegionFields {
            code: code.unwrap_or_default(),
            name: name.unwrap_or_default(),
        };
        update_or_create_region(store, id, &fields).await
    }

    async fn remove(store: &dyn Store, id: i32) -> Result<bool, AppError> {
        store.delete_region(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn top_level_load_requires_code_and_name() {
        let store = MemoryStore::new();
        let err = RegionSchema::load(&store, json!({"code": "AL"}), LoadMode::Create)
            .await
            .unwrap_err();
        let AppError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({"name": ["Missing data for required field."]})
        );
    }

    #[tokio::test]
    async fn post_with_existing_id_updates() {
        let store = MemoryStore::new();
        let created = RegionSchema::load(&store, json!({"code": "AL", "name": "Albania"}), LoadMode::Create)
            .await
            .unwrap();
        let updated = RegionSchema::load(
            &store,
            json!({"id": created.id, "code": "AL", "name": "Shqipëria"}),
            LoadMode::Create,
        )
        .await
        .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Shqipëria");
    }

    #[test]
    fn nested_ref_checks_lengths() {
        let errors = parse_ref(json!({"code": "TOO-LONG-CODE"})).unwrap_err();
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({"code": ["Longer than maximum length 10."]})
        );
    }
}
