//! TOML catalogue of entities and named collection specs.
//!
//! ```toml
//! [[entities]]
//! name = "Book"
//! fields = [
//!     { name = "id", storage = "int64", primary_key = true },
//!     { name = "title", storage = "char" },
//!     { name = "price", storage = "decimal(9, 2)", nullable = true },
//! ]
//! relations = [{ name = "author", kind = "belongs_to", target = "Author" }]
//!
//! [[collections]]
//! entity = "Book"
//! index_fields = ["title", "price"]
//! parents = ["author"]
//! facets = "all"
//! use_joins = true
//! ```
//!
//! Field references are plain names resolved against the collection's entity,
//! or `"Entity.field"` for a field of another catalogue entity.

use std::collections::HashSet;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::engine;
use crate::errors::{Derived, SchemaError, SchemaResult};
use crate::naming;
use crate::registry;
use crate::schema::ResolvedSchema;
use crate::spec::{CollectionSpec, Geopoint, Selection};
use crate::types::{EntityDescriptor, Field, FieldDescriptor, RelationDescriptor, RelationKind, StorageType};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    entities: Vec<EntityConfig>,
    #[serde(default)]
    collections: Vec<CollectionConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EntityConfig {
    name: String,
    display_name: Option<String>,
    #[serde(default)]
    fields: Vec<FieldConfig>,
    #[serde(default)]
    relations: Vec<RelationConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldConfig {
    name: String,
    storage: String,
    #[serde(default)]
    nullable: bool,
    #[serde(default)]
    primary_key: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RelationConfig {
    name: String,
    kind: RelationKind,
    target: String,
    target_field: Option<String>,
    #[serde(default)]
    composite: bool,
    #[serde(default)]
    nullable: bool,
}

/// `"all"`, `true`/`false`, or a list of field references.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SelectionConfig {
    Flag(bool),
    Keyword(String),
    List(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CollectionConfig {
    key: Option<String>,
    entity: String,
    name: Option<String>,
    #[serde(default)]
    index_fields: Vec<String>,
    #[serde(default)]
    skip_index_fields: Vec<String>,
    #[serde(default)]
    parents: Vec<String>,
    #[serde(default)]
    children: Vec<String>,
    #[serde(default)]
    geopoints: Vec<Vec<String>>,
    facets: Option<SelectionConfig>,
    sorting_fields: Option<SelectionConfig>,
    detailed_parents: Option<SelectionConfig>,
    detailed_children: Option<SelectionConfig>,
    default_sorting_field: Option<String>,
    #[serde(default)]
    use_joins: bool,
    #[serde(default)]
    override_id: bool,
    #[serde(default)]
    strict_fields: bool,
    #[serde(default)]
    token_separators: Vec<String>,
    #[serde(default)]
    symbols_to_index: Vec<String>,
}

/// A named collection spec bound to one catalogue entity.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogCollection {
    pub key: String,
    pub entity: String,
    pub spec: CollectionSpec,
}

/// Entity descriptors and the collections derived from them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entities: Vec<EntityDescriptor>,
    collections: Vec<CatalogCollection>,
}

impl Catalog {
    pub fn from_path(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|err| SchemaError::config(format!("failed to read catalogue {}: {err}", path.display())))?;
        debug!("loading catalogue from {}", path.display());
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> SchemaResult<Self> {
        let file: CatalogFile =
            toml::from_str(content).map_err(|err| SchemaError::config(format!("invalid catalogue: {err}")))?;
        let entities = build_entities(&file.entities)?;
        let mut catalog = Catalog {
            entities,
            collections: Vec::new(),
        };
        for config in &file.collections {
            let collection = catalog.build_collection(config)?;
            catalog.push_collection(collection)?;
        }
        debug!(
            "catalogue holds {} entities and {} collections",
            catalog.entities.len(),
            catalog.collections.len()
        );
        Ok(catalog)
    }

    /// Builds a catalogue from every `#[derive(IndexEntity)]` type linked into the binary,
    /// with one default collection per entity.
    pub fn from_registry() -> SchemaResult<Self> {
        let mut catalog = Catalog::default();
        for registration in registry::registered_entities() {
            let entity = (registration.descriptor_fn)()?;
            catalog.push_collection(CatalogCollection {
                key: entity.collection_name(),
                entity: entity.name.clone(),
                spec: CollectionSpec::default(),
            })?;
            catalog.entities.push(entity);
        }
        Ok(catalog)
    }

    pub fn entities(&self) -> &[EntityDescriptor] {
        &self.entities
    }

    pub fn collections(&self) -> &[CatalogCollection] {
        &self.collections
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.iter().find(|entity| entity.name == name)
    }

    pub fn collection(&self, key: &str) -> Option<&CatalogCollection> {
        self.collections.iter().find(|collection| collection.key == key)
    }

    /// Runs the derivation engine for the collection registered under `key`.
    pub fn derive(&self, key: &str) -> SchemaResult<Derived<ResolvedSchema>> {
        let collection = self
            .collection(key)
            .ok_or_else(|| SchemaError::config(format!("unknown collection `{key}`")))?;
        let entity = self.entity(&collection.entity).ok_or_else(|| {
            SchemaError::config(format!(
                "collection `{key}` names unknown entity `{}`",
                collection.entity
            ))
        })?;
        engine::derive(entity, &collection.spec)
    }

    /// Derives every collection, keeping per-collection outcomes.
    pub fn derive_all(&self) -> Vec<(String, SchemaResult<Derived<ResolvedSchema>>)> {
        self.collections
            .iter()
            .map(|collection| (collection.key.clone(), self.derive(&collection.key)))
            .collect()
    }

    fn push_collection(&mut self, collection: CatalogCollection) -> SchemaResult<()> {
        if self.collection(&collection.key).is_some() {
            return Err(SchemaError::config(format!(
                "collection key `{}` is declared more than once",
                collection.key
            )));
        }
        self.collections.push(collection);
        Ok(())
    }

    fn build_collection(&self, config: &CollectionConfig) -> SchemaResult<CatalogCollection> {
        let entity = self.entity(&config.entity).ok_or_else(|| {
            SchemaError::config(format!("collection names unknown entity `{}`", config.entity))
        })?;
        let resolve = |references: &[String]| -> SchemaResult<Vec<Field>> {
            references.iter().map(|reference| self.resolve_reference(entity, reference)).collect()
        };
        let selection = |config: &Option<SelectionConfig>, default: Selection<Field>| -> SchemaResult<Selection<Field>> {
            match config {
                None => Ok(default),
                Some(SelectionConfig::Flag(true)) => Ok(Selection::All),
                Some(SelectionConfig::Flag(false)) => Ok(Selection::none()),
                Some(SelectionConfig::Keyword(keyword)) if keyword == "all" => Ok(Selection::All),
                Some(SelectionConfig::Keyword(keyword)) => Err(SchemaError::config(format!(
                    "expected \"all\", a boolean or a list, found \"{keyword}\""
                ))),
                Some(SelectionConfig::List(references)) => Ok(Selection::Explicit(resolve(references)?)),
            }
        };

        let defaults = CollectionSpec::default();
        let spec = CollectionSpec {
            index_fields: resolve(&config.index_fields)?,
            skip_index_fields: resolve(&config.skip_index_fields)?,
            parents: resolve(&config.parents)?,
            children: resolve(&config.children)?,
            geopoints: config
                .geopoints
                .iter()
                .map(|members| resolve(members).map(Geopoint::from_members))
                .collect::<SchemaResult<_>>()?,
            facets: selection(&config.facets, defaults.facets)?,
            sorting_fields: selection(&config.sorting_fields, defaults.sorting_fields)?,
            detailed_parents: selection(&config.detailed_parents, defaults.detailed_parents)?,
            detailed_children: selection(&config.detailed_children, defaults.detailed_children)?,
            default_sorting_field: config
                .default_sorting_field
                .as_deref()
                .map(|reference| self.resolve_reference(entity, reference))
                .transpose()?,
            use_joins: config.use_joins,
            override_id: config.override_id,
            name: config.name.clone(),
            strict_fields: config.strict_fields,
            token_separators: config.token_separators.clone(),
            symbols_to_index: config.symbols_to_index.clone(),
        };

        let key = config
            .key
            .clone()
            .or_else(|| config.name.clone())
            .unwrap_or_else(|| entity.collection_name());
        Ok(CatalogCollection {
            key,
            entity: entity.name.clone(),
            spec,
        })
    }

    fn resolve_reference(&self, entity: &EntityDescriptor, reference: &str) -> SchemaResult<Field> {
        let (owner, name) = match reference.split_once('.') {
            Some((owner, name)) => {
                let owner = self
                    .entity(owner)
                    .ok_or_else(|| SchemaError::config(format!("`{reference}` names unknown entity `{owner}`")))?;
                (owner, name)
            }
            None => (entity, reference),
        };
        owner
            .field(name)
            .ok_or_else(|| SchemaError::config(format!("entity `{}` has no field `{name}`", owner.name)))
    }
}

fn build_entities(configs: &[EntityConfig]) -> SchemaResult<Vec<EntityDescriptor>> {
    let mut seen = HashSet::new();
    let mut entities = Vec::with_capacity(configs.len());
    for config in configs {
        if !seen.insert(config.name.as_str()) {
            return Err(SchemaError::config(format!(
                "entity `{}` is declared more than once",
                config.name
            )));
        }
        let display_name = config
            .display_name
            .clone()
            .unwrap_or_else(|| naming::display_name(&config.name));
        let mut entity = EntityDescriptor::new(config.name.clone(), display_name);
        for field in &config.fields {
            let storage: StorageType = field.storage.parse()?;
            entity.fields.push(
                FieldDescriptor::new(config.name.clone(), field.name.clone(), storage)
                    .with_nullable(field.nullable)
                    .with_primary_key(field.primary_key),
            );
        }
        entities.push(entity);
    }

    // Relations resolve against the scalar-only descriptors built above.
    let targets = entities.clone();
    for (entity, config) in entities.iter_mut().zip(configs) {
        for relation in &config.relations {
            let target = targets
                .iter()
                .find(|target| target.name == relation.target)
                .ok_or_else(|| {
                    SchemaError::config(format!(
                        "relation `{}.{}` targets unknown entity `{}`",
                        config.name, relation.name, relation.target
                    ))
                })?;
            let descriptor = RelationDescriptor::to_entity(
                config.name.clone(),
                relation.name.clone(),
                relation.kind,
                target,
                relation.target_field.as_deref(),
            )?
            .with_composite(relation.composite)
            .with_nullable(relation.nullable);
            entity.relations.push(descriptor);
        }
    }
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARY: &str = r#"
        [[entities]]
        name = "Author"
        fields = [
            { name = "id", storage = "int64", primary_key = true },
            { name = "name", storage = "char" },
        ]

        [[entities]]
        name = "Book"
        fields = [
            { name = "id", storage = "int64", primary_key = true },
            { name = "title", storage = "char" },
            { name = "price", storage = "decimal(9, 2)", nullable = true },
        ]
        relations = [{ name = "author", kind = "belongs_to", target = "Author" }]

        [[collections]]
        entity = "Book"
        index_fields = ["title", "price"]
        parents = ["author"]
        facets = "all"
        use_joins = true

        [[collections]]
        key = "authors"
        entity = "Author"
        sorting_fields = false
    "#;

    #[test]
    fn loads_entities_and_collections() {
        let catalog = Catalog::from_toml_str(LIBRARY).unwrap();
        assert_eq!(catalog.entities().len(), 2);
        let book = catalog.entity("Book").unwrap();
        assert_eq!(book.relation("author").unwrap().target_collection, "author");
        let keys: Vec<_> = catalog.collections().iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, ["book", "authors"]);
        assert_eq!(catalog.collection("authors").unwrap().spec.sorting_fields, Selection::none());
    }

    #[test]
    fn derives_a_collection_by_key() {
        let catalog = Catalog::from_toml_str(LIBRARY).unwrap();
        let schema = catalog.derive("book").unwrap().into_inner();
        assert_eq!(schema.field_names(), ["title", "price", "author_id"]);
    }

    #[test]
    fn unknown_references_are_config_errors() {
        let broken = LIBRARY.replace(r#"parents = ["author"]"#, r#"parents = ["publisher"]"#);
        assert!(matches!(Catalog::from_toml_str(&broken), Err(SchemaError::Config { .. })));

        let catalog = Catalog::from_toml_str(LIBRARY).unwrap();
        assert!(matches!(catalog.derive("missing"), Err(SchemaError::Config { .. })));
    }
}
