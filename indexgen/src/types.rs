use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{SchemaError, SchemaResult};
use crate::naming::collection_name;

/// Native storage type of a scalar entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageType {
    Int8,
    Int16,
    Int32,
    Int64,
    #[serde(rename = "uint8")]
    UInt8,
    #[serde(rename = "uint16")]
    UInt16,
    #[serde(rename = "uint32")]
    UInt32,
    #[serde(rename = "uint64")]
    UInt64,
    Float,
    /// Fixed-point number with `precision` total digits and `scale` decimal places.
    Decimal {
        precision: u32,
        scale: u32,
    },
    Boolean,
    Char,
    Text,
    Slug,
    Email,
    Url,
    IpAddress,
    Uuid,
    FilePath,
    Json,
    Date,
    #[serde(alias = "datetime")]
    DateTime,
    Time,
    Duration,
    Binary,
    File,
    Image,
}

impl StorageType {
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            StorageType::Int8
                | StorageType::Int16
                | StorageType::Int32
                | StorageType::Int64
                | StorageType::UInt8
                | StorageType::UInt16
                | StorageType::UInt32
                | StorageType::UInt64
        )
    }

    /// Float or decimal storage; the only types a geopoint member may use.
    pub fn is_fractional(self) -> bool {
        matches!(self, StorageType::Float | StorageType::Decimal { .. })
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_fractional()
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, StorageType::Date | StorageType::DateTime)
    }

    /// Numeric and date storage types are the only ones the search service can sort on.
    pub fn is_sortable(self) -> bool {
        self.is_numeric() || self.is_temporal()
    }

    pub const fn label(self) -> &'static str {
        match self {
            StorageType::Int8 => "int8",
            StorageType::Int16 => "int16",
            StorageType::Int32 => "int32",
            StorageType::Int64 => "int64",
            StorageType::UInt8 => "uint8",
            StorageType::UInt16 => "uint16",
            StorageType::UInt32 => "uint32",
            StorageType::UInt64 => "uint64",
            StorageType::Float => "float",
            StorageType::Decimal { .. } => "decimal",
            StorageType::Boolean => "boolean",
            StorageType::Char => "char",
            StorageType::Text => "text",
            StorageType::Slug => "slug",
            StorageType::Email => "email",
            StorageType::Url => "url",
            StorageType::IpAddress => "ip_address",
            StorageType::Uuid => "uuid",
            StorageType::FilePath => "file_path",
            StorageType::Json => "json",
            StorageType::Date => "date",
            StorageType::DateTime => "date_time",
            StorageType::Time => "time",
            StorageType::Duration => "duration",
            StorageType::Binary => "binary",
            StorageType::File => "file",
            StorageType::Image => "image",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::Decimal { precision, scale } => write!(f, "decimal({precision}, {scale})"),
            other => f.write_str(other.label()),
        }
    }
}

impl FromStr for StorageType {
    type Err = SchemaError;

    /// Parses a storage label such as `"email"` or `"decimal(9, 6)"`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if let Some(args) = value.strip_prefix("decimal(").and_then(|rest| rest.strip_suffix(')')) {
            let parsed: Vec<u32> = args
                .split(',')
                .map(|part| part.trim().parse::<u32>())
                .collect::<Result<_, _>>()
                .map_err(|_| SchemaError::config(format!("invalid decimal arguments in `{value}`")))?;
            let [precision, scale] = parsed.as_slice() else {
                return Err(SchemaError::config(format!(
                    "`{value}` needs exactly a precision and a scale"
                )));
            };
            return Ok(StorageType::Decimal {
                precision: *precision,
                scale: *scale,
            });
        }
        let storage = match value {
            "int8" => StorageType::Int8,
            "int16" => StorageType::Int16,
            "int32" => StorageType::Int32,
            "int64" => StorageType::Int64,
            "uint8" => StorageType::UInt8,
            "uint16" => StorageType::UInt16,
            "uint32" => StorageType::UInt32,
            "uint64" => StorageType::UInt64,
            "float" => StorageType::Float,
            "boolean" | "bool" => StorageType::Boolean,
            "char" => StorageType::Char,
            "text" => StorageType::Text,
            "slug" => StorageType::Slug,
            "email" => StorageType::Email,
            "url" => StorageType::Url,
            "ip_address" => StorageType::IpAddress,
            "uuid" => StorageType::Uuid,
            "file_path" => StorageType::FilePath,
            "json" => StorageType::Json,
            "date" => StorageType::Date,
            "date_time" | "datetime" => StorageType::DateTime,
            "time" => StorageType::Time,
            "duration" => StorageType::Duration,
            "binary" => StorageType::Binary,
            "file" => StorageType::File,
            "image" => StorageType::Image,
            other => return Err(SchemaError::config(format!("unknown storage type `{other}`"))),
        };
        Ok(storage)
    }
}

/// Identity of a field: the owning entity plus the field name.
///
/// Two entities may declare fields with the same name; their keys differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldKey {
    pub entity: String,
    pub name: String,
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity, self.name)
    }
}

/// A scalar attribute of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    /// Name of the owning entity.
    pub entity: String,
    pub name: String,
    pub storage: StorageType,
    pub nullable: bool,
    pub primary_key: bool,
}

impl FieldDescriptor {
    pub fn new(entity: impl Into<String>, name: impl Into<String>, storage: StorageType) -> Self {
        Self {
            entity: entity.into(),
            name: name.into(),
            storage,
            nullable: false,
            primary_key: false,
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self
    }

    pub fn key(&self) -> FieldKey {
        FieldKey {
            entity: self.entity.clone(),
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// One-to-many: the inverse side of another entity's `BelongsTo`.
    #[default]
    HasMany,
    ManyToMany,
    /// Many-to-one reference from the owning entity to the target.
    BelongsTo,
}

impl RelationKind {
    pub const fn label(self) -> &'static str {
        match self {
            RelationKind::HasMany => "has_many",
            RelationKind::ManyToMany => "many_to_many",
            RelationKind::BelongsTo => "belongs_to",
        }
    }
}

/// A relationship between the owning entity and a target entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationDescriptor {
    /// Name of the owning entity.
    pub entity: String,
    pub name: String,
    pub kind: RelationKind,
    /// Name of the target entity.
    pub target: String,
    /// Normalized collection name of the target entity.
    pub target_collection: String,
    /// Field of the target the relation points at (its primary key unless overridden).
    pub target_field: FieldDescriptor,
    /// More than one column pair participates in the relation.
    pub composite: bool,
    pub nullable: bool,
}

impl RelationDescriptor {
    pub fn new(
        entity: impl Into<String>,
        name: impl Into<String>,
        kind: RelationKind,
        target_collection: impl Into<String>,
        target_field: FieldDescriptor,
    ) -> Self {
        Self {
            entity: entity.into(),
            name: name.into(),
            kind,
            target: target_field.entity.clone(),
            target_collection: target_collection.into(),
            target_field,
            composite: false,
            nullable: false,
        }
    }

    /// Builds a relation pointing at `target`, joining on `target_field` or its primary key.
    pub fn to_entity(
        entity: impl Into<String>,
        name: impl Into<String>,
        kind: RelationKind,
        target: &EntityDescriptor,
        target_field: Option<&str>,
    ) -> SchemaResult<Self> {
        let name = name.into();
        let field = match target_field {
            Some(field) => target.scalar(field),
            None => target.primary_key(),
        }
        .ok_or_else(|| {
            SchemaError::config(format!(
                "relation `{name}` targets `{}` which has no field `{}`",
                target.name,
                target_field.unwrap_or("<primary key>")
            ))
        })?;
        Ok(Self::new(entity, name, kind, target.collection_name(), field.clone()))
    }

    /// Same as [`RelationDescriptor::to_entity`] for targets known at compile time.
    pub fn for_target<T: IndexEntity>(
        entity: impl Into<String>,
        name: impl Into<String>,
        kind: RelationKind,
        target_field: Option<&str>,
    ) -> SchemaResult<Self> {
        let name = name.into();
        let field = match target_field {
            Some(field) => T::scalar_field(field),
            None => T::primary_key(),
        }
        .ok_or_else(|| {
            SchemaError::config(format!(
                "relation `{name}` targets `{}` which has no field `{}`",
                T::ENTITY_NAME,
                target_field.unwrap_or("<primary key>")
            ))
        })?;
        Ok(Self::new(entity, name, kind, T::collection_name(), field))
    }

    pub fn with_composite(mut self, composite: bool) -> Self {
        self.composite = composite;
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn is_self_referential(&self) -> bool {
        self.target == self.entity
    }

    pub fn key(&self) -> FieldKey {
        FieldKey {
            entity: self.entity.clone(),
            name: self.name.clone(),
        }
    }
}

/// A selectable member of an entity: a scalar field or a relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Scalar(FieldDescriptor),
    Relation(RelationDescriptor),
}

impl Field {
    pub fn key(&self) -> FieldKey {
        match self {
            Field::Scalar(field) => field.key(),
            Field::Relation(relation) => relation.key(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Field::Scalar(field) => &field.name,
            Field::Relation(relation) => &relation.name,
        }
    }

    pub fn entity(&self) -> &str {
        match self {
            Field::Scalar(field) => &field.entity,
            Field::Relation(relation) => &relation.entity,
        }
    }

    pub fn is_relation(&self) -> bool {
        matches!(self, Field::Relation(_))
    }

    pub fn as_scalar(&self) -> Option<&FieldDescriptor> {
        match self {
            Field::Scalar(field) => Some(field),
            Field::Relation(_) => None,
        }
    }

    pub fn as_relation(&self) -> Option<&RelationDescriptor> {
        match self {
            Field::Relation(relation) => Some(relation),
            Field::Scalar(_) => None,
        }
    }
}

impl From<FieldDescriptor> for Field {
    fn from(field: FieldDescriptor) -> Self {
        Field::Scalar(field)
    }
}

impl From<RelationDescriptor> for Field {
    fn from(relation: RelationDescriptor) -> Self {
        Field::Relation(relation)
    }
}

impl From<&FieldDescriptor> for Field {
    fn from(field: &FieldDescriptor) -> Self {
        Field::Scalar(field.clone())
    }
}

impl From<&RelationDescriptor> for Field {
    fn from(relation: &RelationDescriptor) -> Self {
        Field::Relation(relation.clone())
    }
}

/// Read-only description of an entity's fields and relations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub name: String,
    /// Human readable name; the collection name is derived from it.
    pub display_name: String,
    pub fields: Vec<FieldDescriptor>,
    pub relations: Vec<RelationDescriptor>,
}

impl EntityDescriptor {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            fields: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Appends a scalar field owned by this entity.
    pub fn with_field(mut self, name: impl Into<String>, storage: StorageType) -> Self {
        let field = FieldDescriptor::new(self.name.clone(), name, storage);
        self.fields.push(field);
        self
    }

    pub fn with_descriptor(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_relation(mut self, relation: RelationDescriptor) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn scalar(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDescriptor> {
        self.relations.iter().find(|relation| relation.name == name)
    }

    /// Looks a member up by name, scalars first.
    pub fn field(&self, name: &str) -> Option<Field> {
        self.scalar(name)
            .map(Field::from)
            .or_else(|| self.relation(name).map(Field::from))
    }

    pub fn primary_key(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.primary_key)
    }

    pub fn collection_name(&self) -> String {
        collection_name(&self.display_name)
    }

    /// True only for a descriptor identical to one this entity declares.
    ///
    /// A copy with this entity's key but a different storage, nullability or
    /// primary-key flag is stale and is not owned.
    pub fn owns_scalar(&self, field: &FieldDescriptor) -> bool {
        self.fields.iter().any(|own| own == field)
    }

    /// True only for a descriptor identical to one of this entity's relations.
    pub fn owns_relation(&self, relation: &RelationDescriptor) -> bool {
        self.relations.iter().any(|own| own == relation)
    }

    pub fn owns(&self, field: &Field) -> bool {
        match field {
            Field::Scalar(field) => self.owns_scalar(field),
            Field::Relation(relation) => self.owns_relation(relation),
        }
    }
}

/// Implemented by `#[derive(IndexEntity)]` to describe a Rust struct as an entity.
pub trait IndexEntity {
    const ENTITY_NAME: &'static str;
    const DISPLAY_NAME: &'static str;

    fn scalar_fields() -> Vec<FieldDescriptor>;

    fn relations() -> SchemaResult<Vec<RelationDescriptor>>;

    fn primary_key() -> Option<FieldDescriptor> {
        Self::scalar_fields().into_iter().find(|field| field.primary_key)
    }

    fn scalar_field(name: &str) -> Option<FieldDescriptor> {
        Self::scalar_fields().into_iter().find(|field| field.name == name)
    }

    fn collection_name() -> String {
        collection_name(Self::DISPLAY_NAME)
    }

    fn entity_descriptor() -> SchemaResult<EntityDescriptor> {
        Ok(EntityDescriptor {
            name: Self::ENTITY_NAME.to_string(),
            display_name: Self::DISPLAY_NAME.to_string(),
            fields: Self::scalar_fields(),
            relations: Self::relations()?,
        })
    }
}
