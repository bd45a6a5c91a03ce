use serde::{Deserialize, Deserializer, Serialize};

use crate::engine::resolver::ResolvedSelection;
use crate::engine::type_mapper::SearchType;

/// A scalar or geopoint field of the output schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: SearchType,
    pub facet: bool,
    pub sort: bool,
    pub optional: bool,
    pub index: bool,
    pub locale: String,
    pub infix: bool,
    pub stem: bool,
    #[serde(skip, default = "stored")]
    pub store: bool,
}

fn stored() -> bool {
    true
}

fn indexed() -> bool {
    true
}

impl SchemaField {
    pub fn new(name: impl Into<String>, field_type: SearchType) -> Self {
        Self {
            name: name.into(),
            field_type,
            facet: false,
            sort: false,
            optional: false,
            index: true,
            locale: String::new(),
            infix: false,
            stem: false,
            store: true,
        }
    }
}

/// A join or nested-object field of the output schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: SearchType,
    pub facet: bool,
    pub index: bool,
    pub optional: bool,
    /// `"<collection>.<field>"`; set on join fields only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl RelationField {
    pub fn is_join(&self) -> bool {
        self.reference.is_some()
    }

    pub fn is_nested(&self) -> bool {
        matches!(self.field_type, SearchType::Object | SearchType::ObjectArray)
    }
}

/// Result of a successful derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSchema {
    pub name: String,
    pub fields: Vec<SchemaField>,
    pub relation_fields: Vec<RelationField>,
    /// Empty when no default sorting field was requested.
    pub default_sorting_field: String,
    pub token_separators: Vec<String>,
    pub symbols_to_index: Vec<String>,
    pub selection: ResolvedSelection,
}

impl ResolvedSchema {
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn relation_field(&self, name: &str) -> Option<&RelationField> {
        self.relation_fields.iter().find(|field| field.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .map(|field| field.name.as_str())
            .chain(self.relation_fields.iter().map(|field| field.name.as_str()))
            .collect()
    }

    pub fn has_nested_fields(&self) -> bool {
        self.relation_fields.iter().any(RelationField::is_nested)
    }

    /// Builds the body sent to the search service's collection endpoints.
    pub fn to_wire(&self) -> CollectionSchema {
        CollectionSchema {
            name: self.name.clone(),
            fields: self
                .fields
                .iter()
                .cloned()
                .map(WireField::Scalar)
                .chain(self.relation_fields.iter().cloned().map(WireField::Relation))
                .collect(),
            default_sorting_field: Some(self.default_sorting_field.clone()).filter(|name| !name.is_empty()),
            enable_nested_fields: self.has_nested_fields().then_some(true),
            token_separators: self.token_separators.clone(),
            symbols_to_index: self.symbols_to_index.clone(),
        }
    }
}

/// One entry of the wire `fields` array.
///
/// Reading a body back, an entry carrying a `reference` or an object type is a
/// relation field; anything else is a scalar. The search service reports every
/// attribute on every field, so key sets alone cannot tell them apart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireField {
    Relation(RelationField),
    Scalar(SchemaField),
}

/// Union of the scalar and relation field attributes.
#[derive(Deserialize)]
struct AnyWireField {
    name: String,
    #[serde(rename = "type")]
    field_type: SearchType,
    #[serde(default)]
    facet: bool,
    #[serde(default)]
    sort: bool,
    #[serde(default)]
    optional: bool,
    #[serde(default = "indexed")]
    index: bool,
    #[serde(default)]
    locale: String,
    #[serde(default)]
    infix: bool,
    #[serde(default)]
    stem: bool,
    #[serde(default)]
    reference: Option<String>,
}

impl From<AnyWireField> for WireField {
    fn from(field: AnyWireField) -> Self {
        let nested = matches!(field.field_type, SearchType::Object | SearchType::ObjectArray);
        if field.reference.is_some() || nested {
            WireField::Relation(RelationField {
                name: field.name,
                field_type: field.field_type,
                facet: field.facet,
                index: field.index,
                optional: field.optional,
                reference: field.reference,
            })
        } else {
            WireField::Scalar(SchemaField {
                name: field.name,
                field_type: field.field_type,
                facet: field.facet,
                sort: field.sort,
                optional: field.optional,
                index: field.index,
                locale: field.locale,
                infix: field.infix,
                stem: field.stem,
                store: true,
            })
        }
    }
}

impl<'de> Deserialize<'de> for WireField {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        AnyWireField::deserialize(deserializer).map(WireField::from)
    }
}

impl WireField {
    pub fn name(&self) -> &str {
        match self {
            WireField::Scalar(field) => &field.name,
            WireField::Relation(field) => &field.name,
        }
    }

    pub fn field_type(&self) -> SearchType {
        match self {
            WireField::Scalar(field) => field.field_type,
            WireField::Relation(field) => field.field_type,
        }
    }
}

/// Collection body in the search service's wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    pub fields: Vec<WireField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sorting_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_nested_fields: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub token_separators: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols_to_index: Vec<String>,
}

impl CollectionSchema {
    pub fn field(&self, name: &str) -> Option<&WireField> {
        self.fields.iter().find(|field| field.name() == name)
    }
}
