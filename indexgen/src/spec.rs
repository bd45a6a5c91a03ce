use crate::types::Field;

/// A set parameter that is either an explicit list or "everything eligible".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    All,
    Explicit(Vec<T>),
}

impl<T> Selection<T> {
    pub fn none() -> Self {
        Selection::Explicit(Vec::new())
    }

    pub fn explicit<I, U>(items: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<T>,
    {
        Selection::Explicit(items.into_iter().map(Into::into).collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Selection::none()
    }
}

/// A latitude/longitude pair combined into one geopoint field.
///
/// Built from an arbitrary member list so a malformed entry can be reported
/// instead of rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geopoint {
    pub members: Vec<Field>,
}

impl Geopoint {
    pub fn new(lat: impl Into<Field>, lng: impl Into<Field>) -> Self {
        Self {
            members: vec![lat.into(), lng.into()],
        }
    }

    pub fn from_members<I, U>(members: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<Field>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
        }
    }
}

/// Declarative selection options for one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub index_fields: Vec<Field>,
    pub skip_index_fields: Vec<Field>,
    pub parents: Vec<Field>,
    pub children: Vec<Field>,
    pub geopoints: Vec<Geopoint>,
    pub facets: Selection<Field>,
    pub sorting_fields: Selection<Field>,
    pub detailed_parents: Selection<Field>,
    pub detailed_children: Selection<Field>,
    pub default_sorting_field: Option<Field>,
    pub use_joins: bool,
    /// Index the primary key as a regular field during implicit discovery.
    pub override_id: bool,
    /// Overrides the collection name derived from the entity's display name.
    pub name: Option<String>,
    /// Treat fields outside the entity's catalogue as errors instead of warnings.
    pub strict_fields: bool,
    pub token_separators: Vec<String>,
    pub symbols_to_index: Vec<String>,
}

impl Default for CollectionSpec {
    fn default() -> Self {
        Self {
            index_fields: Vec::new(),
            skip_index_fields: Vec::new(),
            parents: Vec::new(),
            children: Vec::new(),
            geopoints: Vec::new(),
            facets: Selection::none(),
            sorting_fields: Selection::All,
            detailed_parents: Selection::none(),
            detailed_children: Selection::none(),
            default_sorting_field: None,
            use_joins: false,
            override_id: false,
            name: None,
            strict_fields: false,
            token_separators: Vec::new(),
            symbols_to_index: Vec::new(),
        }
    }
}

fn collect<I, U>(items: I) -> Vec<Field>
where
    I: IntoIterator<Item = U>,
    U: Into<Field>,
{
    items.into_iter().map(Into::into).collect()
}

impl CollectionSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no selection set forces explicit mode.
    pub fn is_implicit(&self) -> bool {
        self.index_fields.is_empty() && self.parents.is_empty() && self.children.is_empty() && self.geopoints.is_empty()
    }

    pub fn with_index_fields<I, U>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<Field>,
    {
        self.index_fields = collect(fields);
        self
    }

    pub fn with_skip_index_fields<I, U>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<Field>,
    {
        self.skip_index_fields = collect(fields);
        self
    }

    pub fn with_parents<I, U>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<Field>,
    {
        self.parents = collect(relations);
        self
    }

    pub fn with_children<I, U>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<Field>,
    {
        self.children = collect(relations);
        self
    }

    pub fn with_geopoint(mut self, geopoint: Geopoint) -> Self {
        self.geopoints.push(geopoint);
        self
    }

    pub fn with_facets(mut self, facets: Selection<Field>) -> Self {
        self.facets = facets;
        self
    }

    pub fn with_sorting_fields(mut self, sorting_fields: Selection<Field>) -> Self {
        self.sorting_fields = sorting_fields;
        self
    }

    pub fn with_detailed_parents(mut self, detailed_parents: Selection<Field>) -> Self {
        self.detailed_parents = detailed_parents;
        self
    }

    pub fn with_detailed_children(mut self, detailed_children: Selection<Field>) -> Self {
        self.detailed_children = detailed_children;
        self
    }

    pub fn with_default_sorting_field(mut self, field: impl Into<Field>) -> Self {
        self.default_sorting_field = Some(field.into());
        self
    }

    pub fn with_joins(mut self, use_joins: bool) -> Self {
        self.use_joins = use_joins;
        self
    }

    pub fn with_override_id(mut self, override_id: bool) -> Self {
        self.override_id = override_id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_strict_fields(mut self, strict_fields: bool) -> Self {
        self.strict_fields = strict_fields;
        self
    }

    pub fn with_token_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.token_separators = separators.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_symbols_to_index<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols_to_index = symbols.into_iter().map(Into::into).collect();
        self
    }
}
