#![allow(dead_code, unused_imports)]

pub(crate) use chrono::NaiveDate;
pub(crate) use indexgen::{
    CollectionSpec, EntityDescriptor, Field, FieldDescriptor, Geopoint, IndexEntity, MalformedReason,
    RelationDescriptor, RelationKind, ResolvedSchema, SchemaError, SearchType, Selection, StorageType, Warning, derive,
    derive_for,
};

#[derive(IndexEntity)]
pub struct Author {
    #[index(primary_key)]
    pub id: i64,
    pub name: String,
    pub born: Option<NaiveDate>,
}

#[derive(IndexEntity)]
pub struct Book {
    #[index(primary_key)]
    pub id: i64,
    pub title: String,
    pub pages: i32,
    #[index(decimal(precision = 9, scale = 2))]
    pub price: f64,
    pub published: NaiveDate,
    pub in_print: bool,
    #[index(relation(belongs_to = Author))]
    pub author: i64,
    #[index(relation(has_many = Chapter))]
    pub chapters: Vec<Chapter>,
    #[index(skip)]
    pub cover: Vec<u8>,
}

#[derive(IndexEntity)]
pub struct Chapter {
    #[index(primary_key)]
    pub id: i64,
    pub title: String,
    pub number: i32,
    #[index(relation(belongs_to = Book))]
    pub book: i64,
}

#[derive(IndexEntity)]
#[index(display_name = "place")]
pub struct GeoPoint {
    #[index(primary_key)]
    pub id: i64,
    pub name: String,
    pub lat: f64,
    #[index(decimal(precision = 9, scale = 6))]
    pub long: f64,
    pub label: String,
}

/// Reviews join on the book title instead of its primary key.
#[derive(IndexEntity)]
pub struct JoinOnAnotherField {
    #[index(primary_key)]
    pub id: i64,
    pub body: String,
    #[index(relation(belongs_to = Book, target_field = "title"))]
    pub book: String,
}

#[derive(IndexEntity)]
pub struct CompositeForeignKey {
    #[index(primary_key)]
    pub id: i64,
    pub edition: i32,
    #[index(relation(belongs_to = Book, composite))]
    pub book: i64,
}

#[derive(IndexEntity)]
#[index(relation(many_to_many = Book, name = "books"))]
pub struct Reader {
    #[index(primary_key)]
    pub id: i64,
    pub name: String,
}

#[derive(IndexEntity)]
pub struct OptionalFields {
    #[index(primary_key)]
    pub id: i64,
    pub nickname: Option<String>,
    pub age: Option<i32>,
    pub score: i32,
    #[index(relation(belongs_to = Author))]
    pub mentor: Option<i64>,
}

#[derive(IndexEntity)]
pub struct SelfRef {
    #[index(primary_key)]
    pub id: i64,
    pub name: String,
    #[index(relation(belongs_to = SelfRef))]
    pub parent: Option<i64>,
}

#[derive(IndexEntity)]
#[index(display_name = "Verbose-Name")]
pub struct VerboseName {
    #[index(primary_key)]
    pub id: i64,
    #[index(storage = "email")]
    pub contact: String,
}

pub(crate) fn author() -> EntityDescriptor {
    Author::entity_descriptor().expect("author descriptor")
}

pub(crate) fn book() -> EntityDescriptor {
    Book::entity_descriptor().expect("book descriptor")
}

pub(crate) fn chapter() -> EntityDescriptor {
    Chapter::entity_descriptor().expect("chapter descriptor")
}

pub(crate) fn geo_point() -> EntityDescriptor {
    GeoPoint::entity_descriptor().expect("geo point descriptor")
}

/// Looks up a member of `entity` by name.
pub(crate) fn field(entity: &EntityDescriptor, name: &str) -> Field {
    entity
        .field(name)
        .unwrap_or_else(|| panic!("{} has no member `{name}`", entity.name))
}

pub(crate) fn fields(entity: &EntityDescriptor, names: &[&str]) -> Vec<Field> {
    names.iter().map(|name| field(entity, name)).collect()
}

pub(crate) fn derive_ok(entity: &EntityDescriptor, spec: &CollectionSpec) -> ResolvedSchema {
    derive(entity, spec)
        .unwrap_or_else(|err| panic!("derivation of {} failed: {err}", entity.name))
        .into_inner()
}

pub(crate) fn derive_reason(entity: &EntityDescriptor, spec: &CollectionSpec) -> MalformedReason {
    match derive(entity, spec) {
        Err(SchemaError::RequestMalformed(reason)) => reason,
        other => panic!("expected a malformed request, got {other:?}"),
    }
}

pub(crate) fn names(schema: &ResolvedSchema) -> Vec<&str> {
    schema.field_names()
}
