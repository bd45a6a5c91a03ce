use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::engine;
use crate::errors::{ClientError, Derived};
use crate::schema::{CollectionSchema, WireField};
use crate::spec::CollectionSpec;
use crate::types::EntityDescriptor;

/// A collection as reported by the search service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    #[serde(flatten)]
    pub schema: CollectionSchema,
    pub created_at: DateTime<Utc>,
}

/// Field entry that removes an existing field in an update body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropField {
    pub name: String,
    pub drop: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatchField {
    Drop(DropField),
    Add(WireField),
}

/// Body of a collection update: drops first, then additions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaPatch {
    pub fields: Vec<PatchField>,
}

impl SchemaPatch {
    /// Computes the update turning `current` into `desired`.
    ///
    /// A field whose definition changed is dropped and added again.
    pub fn between(current: &CollectionSchema, desired: &CollectionSchema) -> Self {
        let drops = current
            .fields
            .iter()
            .filter(|field| desired.field(field.name()) != Some(*field))
            .map(|field| {
                PatchField::Drop(DropField {
                    name: field.name().to_string(),
                    drop: true,
                })
            });
        let additions = desired
            .fields
            .iter()
            .filter(|field| current.field(field.name()) != Some(*field))
            .cloned()
            .map(PatchField::Add);
        Self {
            fields: drops.chain(additions).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn dropped(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter_map(|field| match field {
            PatchField::Drop(drop) => Some(drop.name.as_str()),
            PatchField::Add(_) => None,
        })
    }

    pub fn added(&self) -> impl Iterator<Item = &WireField> {
        self.fields.iter().filter_map(|field| match field {
            PatchField::Add(field) => Some(field),
            PatchField::Drop(_) => None,
        })
    }
}

/// Remote collection endpoints of a search service.
#[allow(async_fn_in_trait)]
pub trait CollectionClient {
    async fn create(&self, schema: &CollectionSchema) -> Result<CollectionInfo, ClientError>;

    /// Returns `None` when the collection does not exist.
    async fn retrieve(&self, name: &str) -> Result<Option<CollectionInfo>, ClientError>;

    async fn update(&self, name: &str, patch: &SchemaPatch) -> Result<CollectionInfo, ClientError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Created(CollectionInfo),
    Updated { info: CollectionInfo, patch: SchemaPatch },
    Unchanged(CollectionInfo),
}

/// Derives the schema of `entity` and creates or updates its remote collection.
pub async fn sync_collection<C: CollectionClient>(
    client: &C,
    entity: &EntityDescriptor,
    spec: &CollectionSpec,
) -> Result<Derived<SyncOutcome>, ClientError> {
    let derived = engine::derive(entity, spec)?;
    let desired = derived.value.to_wire();

    let outcome = match client.retrieve(&desired.name).await? {
        None => {
            info!("creating collection `{}`", desired.name);
            SyncOutcome::Created(client.create(&desired).await?)
        }
        Some(current) => {
            let patch = SchemaPatch::between(&current.schema, &desired);
            if patch.is_empty() {
                debug!("collection `{}` is up to date", desired.name);
                SyncOutcome::Unchanged(current)
            } else {
                info!("updating collection `{}` with {} field changes", desired.name, patch.fields.len());
                let info = client.update(&desired.name, &patch).await?;
                SyncOutcome::Updated { info, patch }
            }
        }
    };
    Ok(Derived::with_warnings(outcome, derived.warnings))
}

/// In-process collection store, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryClient {
    collections: RwLock<HashMap<String, CollectionInfo>>,
}

fn poisoned<T>(_: T) -> ClientError {
    ClientError::Remote {
        message: "collection store lock poisoned".to_string(),
    }
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection_names(&self) -> Result<Vec<String>, ClientError> {
        let collections = self.collections.read().map_err(poisoned)?;
        let mut names: Vec<String> = collections.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

impl CollectionClient for MemoryClient {
    async fn create(&self, schema: &CollectionSchema) -> Result<CollectionInfo, ClientError> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        if collections.contains_key(&schema.name) {
            return Err(ClientError::CollectionExists {
                name: schema.name.clone(),
            });
        }
        let info = CollectionInfo {
            schema: schema.clone(),
            created_at: Utc::now(),
        };
        collections.insert(schema.name.clone(), info.clone());
        Ok(info)
    }

    async fn retrieve(&self, name: &str) -> Result<Option<CollectionInfo>, ClientError> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections.get(name).cloned())
    }

    async fn update(&self, name: &str, patch: &SchemaPatch) -> Result<CollectionInfo, ClientError> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        let info = collections
            .get_mut(name)
            .ok_or_else(|| ClientError::CollectionNotFound { name: name.to_string() })?;

        let mut fields = info.schema.fields.clone();
        for dropped in patch.dropped() {
            let before = fields.len();
            fields.retain(|field| field.name() != dropped);
            if fields.len() == before {
                return Err(ClientError::Remote {
                    message: format!("field `{dropped}` does not exist in `{name}`"),
                });
            }
        }
        for added in patch.added() {
            if fields.iter().any(|field| field.name() == added.name()) {
                return Err(ClientError::Remote {
                    message: format!("field `{}` already exists in `{name}`", added.name()),
                });
            }
            fields.push(added.clone());
        }
        info.schema.fields = fields;
        Ok(info.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SearchType;
    use crate::schema::SchemaField;

    fn schema(fields: Vec<SchemaField>) -> CollectionSchema {
        CollectionSchema {
            name: "book".to_string(),
            fields: fields.into_iter().map(WireField::Scalar).collect(),
            default_sorting_field: None,
            enable_nested_fields: None,
            token_separators: Vec::new(),
            symbols_to_index: Vec::new(),
        }
    }

    #[test]
    fn patch_drops_changed_and_removed_fields() {
        let current = schema(vec![
            SchemaField::new("title", SearchType::String),
            SchemaField::new("pages", SearchType::Int32),
            SchemaField::new("isbn", SearchType::String),
        ]);
        let desired = schema(vec![
            SchemaField::new("title", SearchType::String),
            SchemaField::new("pages", SearchType::Int64),
            SchemaField::new("price", SearchType::Float32),
        ]);
        let patch = SchemaPatch::between(&current, &desired);
        assert_eq!(patch.dropped().collect::<Vec<_>>(), ["pages", "isbn"]);
        assert_eq!(patch.added().map(WireField::name).collect::<Vec<_>>(), ["pages", "price"]);
    }

    #[test]
    fn identical_schemas_need_no_patch() {
        let current = schema(vec![SchemaField::new("title", SearchType::String)]);
        assert!(SchemaPatch::between(&current, &current.clone()).is_empty());
    }

    #[test]
    fn drop_entries_serialize_with_flag() {
        let patch = SchemaPatch {
            fields: vec![PatchField::Drop(DropField {
                name: "pages".to_string(),
                drop: true,
            })],
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({ "fields": [{ "name": "pages", "drop": true }] })
        );
    }
}
