use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{Cell, Table};
use serde::Serialize;

use indexgen::client::PatchField;
use indexgen::{Catalog, CollectionSchema, SchemaPatch, WireField};

use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay, flag};
use crate::theme::ICONS;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Schema Derivation",
        commands: &[
            "indexgen schema derive books               # Show the derived schema of the books collection",
            "indexgen --output json schema derive books # Print the collection body sent to the search service",
        ],
    },
    ExampleGroup {
        title: "Schema Validation",
        commands: &[
            "indexgen schema validate                   # Derive every collection in the catalogue",
            "indexgen schema validate books             # Derive a single collection",
            "indexgen schema list                       # List the collections declared in the catalogue",
        ],
    },
    ExampleGroup {
        title: "Schema Diff",
        commands: &["indexgen schema diff books --against remote.json  # Show the update turning remote.json into the derived schema"],
    },
];

#[derive(Subcommand)]
pub enum SchemaCommands {
    /// Derive and display the schema of one collection
    #[command(name = "derive")]
    Derive {
        /// Collection key in the catalogue
        key: String,
    },

    /// Derive collections and report errors and warnings
    #[command(name = "validate")]
    Validate {
        /// Collection key to validate (optional, validates all if omitted)
        key: Option<String>,
    },

    /// List the collections declared in the catalogue
    #[command(name = "list")]
    List,

    /// Show the field changes between a stored schema and the derived one
    #[command(name = "diff")]
    Diff {
        /// Collection key in the catalogue
        key: String,

        /// JSON file holding the current collection schema
        #[arg(long)]
        against: PathBuf,
    },
}

pub fn handle_schema_commands(command: SchemaCommands, catalog_path: &Path, output: &OutputManager) -> Result<()> {
    let catalog = Catalog::from_path(catalog_path)
        .with_context(|| format!("Failed to load catalogue {}", catalog_path.display()))?;
    output.verbose(&format!(
        "Loaded {} entities and {} collections from {}",
        catalog.entities().len(),
        catalog.collections().len(),
        catalog_path.display()
    ));

    match command {
        SchemaCommands::Derive { key } => handle_derive(&catalog, &key, output),
        SchemaCommands::Validate { key } => handle_validate(&catalog, key.as_deref(), output),
        SchemaCommands::List => handle_list(&catalog, output),
        SchemaCommands::Diff { key, against } => handle_diff(&catalog, &key, &against, output),
    }
}

fn handle_derive(catalog: &Catalog, key: &str, output: &OutputManager) -> Result<()> {
    let derived = catalog
        .derive(key)
        .with_context(|| format!("Failed to derive collection `{key}`"))?;
    for warning in &derived.warnings {
        output.warning(&warning.to_string());
    }

    let schema = derived.value;
    output.heading(&format!("Collection: {}", schema.name));
    if !schema.default_sorting_field.is_empty() {
        output.key_value("Default sorting field", &schema.default_sorting_field);
    }
    output.display(&SchemaView(schema.to_wire()))
}

fn handle_validate(catalog: &Catalog, key: Option<&str>, output: &OutputManager) -> Result<()> {
    let results = match key {
        Some(key) => vec![(key.to_string(), catalog.derive(key))],
        None => catalog.derive_all(),
    };

    if results.is_empty() {
        output.warning("No collections declared in the catalogue");
        return Ok(());
    }

    let report = ValidationReport {
        results: results
            .into_iter()
            .map(|(key, result)| match result {
                Ok(derived) if derived.has_warnings() => ValidationEntry {
                    key,
                    status: ValidationStatus::Warning,
                    messages: derived.warnings.iter().map(ToString::to_string).collect(),
                },
                Ok(_) => ValidationEntry {
                    key,
                    status: ValidationStatus::Ok,
                    messages: Vec::new(),
                },
                Err(err) => ValidationEntry {
                    key,
                    status: ValidationStatus::Error,
                    messages: vec![err.to_string()],
                },
            })
            .collect(),
    };

    output.heading("Schema Validation");
    output.display(&report)?;

    let failures = report.failures();
    if failures > 0 {
        anyhow::bail!("{failures} collection(s) failed validation");
    }
    output.success(&format!("{} collection(s) derived successfully", report.results.len()));
    Ok(())
}

fn handle_list(catalog: &Catalog, output: &OutputManager) -> Result<()> {
    if catalog.collections().is_empty() {
        output.warning("No collections declared in the catalogue");
        output.info("Add a [[collections]] table naming an entity to the catalogue");
        return Ok(());
    }

    let view = ListView {
        collections: catalog
            .collections()
            .iter()
            .map(|collection| ListEntry {
                key: collection.key.clone(),
                entity: collection.entity.clone(),
                mode: if collection.spec.is_implicit() { "implicit" } else { "explicit" },
                joins: collection.spec.use_joins,
            })
            .collect(),
    };

    output.heading("Collections");
    output.display(&view)
}

fn handle_diff(catalog: &Catalog, key: &str, against: &Path, output: &OutputManager) -> Result<()> {
    let content =
        std::fs::read_to_string(against).with_context(|| format!("Failed to read {}", against.display()))?;
    let current: CollectionSchema = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a collection schema", against.display()))?;

    let derived = catalog
        .derive(key)
        .with_context(|| format!("Failed to derive collection `{key}`"))?;
    for warning in &derived.warnings {
        output.warning(&warning.to_string());
    }
    let desired = derived.value.to_wire();
    if current.name != desired.name {
        output.warning(&format!(
            "Comparing collection `{}` against a schema named `{}`",
            desired.name, current.name
        ));
    }

    let patch = SchemaPatch::between(&current, &desired);
    if patch.is_empty() {
        output.success(&format!("Collection `{}` is up to date", desired.name));
        return Ok(());
    }

    output.heading(&format!("Pending changes for {}", desired.name));
    output.display(&PatchView(patch))
}

/// Wire body of a derived collection.
#[derive(Serialize)]
#[serde(transparent)]
struct SchemaView(CollectionSchema);

impl TableDisplay for SchemaView {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table(&["Field", "Type", "Facet", "Sort", "Optional", "Index", "Reference"]);
        for field in &self.0.fields {
            let row = match field {
                WireField::Scalar(field) => vec![
                    Cell::new(&field.name),
                    Cell::new(field.field_type),
                    Cell::new(flag(field.facet)),
                    Cell::new(flag(field.sort)),
                    Cell::new(flag(field.optional)),
                    Cell::new(flag(field.index)),
                    Cell::new(""),
                ],
                WireField::Relation(field) => vec![
                    Cell::new(&field.name),
                    Cell::new(field.field_type),
                    Cell::new(flag(field.facet)),
                    Cell::new(""),
                    Cell::new(flag(field.optional)),
                    Cell::new(flag(field.index)),
                    Cell::new(field.reference.as_deref().unwrap_or("")),
                ],
            };
            table.add_row(row);
        }
        table
    }

    fn to_compact(&self) -> String {
        let fields: Vec<String> = self
            .0
            .fields
            .iter()
            .map(|field| format!("{}:{}", field.name(), field.field_type()))
            .collect();
        format!("{} {}", self.0.name, fields.join(","))
    }
}

#[derive(Serialize)]
struct ListEntry {
    key: String,
    entity: String,
    mode: &'static str,
    joins: bool,
}

#[derive(Serialize)]
struct ListView {
    collections: Vec<ListEntry>,
}

impl TableDisplay for ListView {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table(&["Key", "Entity", "Mode", "Joins"]);
        for entry in &self.collections {
            table.add_row(vec![
                Cell::new(&entry.key),
                Cell::new(&entry.entity),
                Cell::new(entry.mode),
                Cell::new(flag(entry.joins)),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.collections
            .iter()
            .map(|entry| format!("{}={}", entry.key, entry.entity))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
enum ValidationStatus {
    Ok,
    Warning,
    Error,
}

impl ValidationStatus {
    fn icon(self) -> &'static str {
        match self {
            ValidationStatus::Ok => ICONS.success,
            ValidationStatus::Warning => ICONS.warning,
            ValidationStatus::Error => ICONS.error,
        }
    }
}

#[derive(Serialize)]
struct ValidationEntry {
    key: String,
    status: ValidationStatus,
    messages: Vec<String>,
}

#[derive(Serialize)]
struct ValidationReport {
    results: Vec<ValidationEntry>,
}

impl ValidationReport {
    fn failures(&self) -> usize {
        self.results
            .iter()
            .filter(|entry| entry.status == ValidationStatus::Error)
            .count()
    }
}

impl TableDisplay for ValidationReport {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table(&["Collection", "Status", "Details"]);
        for entry in &self.results {
            table.add_row(vec![
                Cell::new(&entry.key),
                Cell::new(entry.status.icon()),
                Cell::new(entry.messages.join("\n")),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.results
            .iter()
            .map(|entry| format!("{}:{}", entry.key, entry.status.icon()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Update body that would bring a stored collection in line with the derived schema.
#[derive(Serialize)]
#[serde(transparent)]
struct PatchView(SchemaPatch);

impl TableDisplay for PatchView {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table(&["Change", "Field", "Type"]);
        for field in &self.0.fields {
            let row = match field {
                PatchField::Drop(drop) => vec![Cell::new(ICONS.minus), Cell::new(&drop.name), Cell::new("")],
                PatchField::Add(field) => vec![
                    Cell::new(ICONS.plus),
                    Cell::new(field.name()),
                    Cell::new(field.field_type()),
                ],
            };
            table.add_row(row);
        }
        table
    }

    fn to_compact(&self) -> String {
        let dropped = self.0.dropped().map(|name| format!("{}{name}", ICONS.minus));
        let added = self.0.added().map(|field| format!("{}{}", ICONS.plus, field.name()));
        dropped.chain(added).collect::<Vec<_>>().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::GlobalOptions;

    const CATALOG: &str = r#"
[[entities]]
name = "Book"

[[entities.fields]]
name = "id"
storage = "int64"
primary_key = true

[[entities.fields]]
name = "title"
storage = "text"

[[collections]]
key = "books"
entity = "Book"
"#;

    fn manager() -> OutputManager {
        OutputManager::new(GlobalOptions {
            no_color: true,
            quiet: true,
            ..Default::default()
        })
    }

    #[test]
    fn test_schema_view_lists_every_field() {
        let catalog = Catalog::from_toml_str(CATALOG).expect("catalogue parses");
        let schema = catalog.derive("books").expect("books derives").value.to_wire();
        let view = SchemaView(schema);

        let rendered = view.to_table(&manager()).to_string();
        assert!(rendered.contains("title"));
        assert_eq!(view.to_compact(), "book title:string");
    }

    #[test]
    fn test_validation_report_counts_failures() {
        let report = ValidationReport {
            results: vec![
                ValidationEntry {
                    key: "books".to_string(),
                    status: ValidationStatus::Ok,
                    messages: Vec::new(),
                },
                ValidationEntry {
                    key: "authors".to_string(),
                    status: ValidationStatus::Error,
                    messages: vec!["boom".to_string()],
                },
            ],
        };
        assert_eq!(report.failures(), 1);
        let json = serde_json::to_value(&report).expect("report serializes");
        assert_eq!(json["results"][1]["status"], "error");
    }

    #[test]
    fn test_validate_fails_on_unknown_collection() {
        let catalog = Catalog::from_toml_str(CATALOG).expect("catalogue parses");
        assert!(handle_validate(&catalog, Some("missing"), &manager()).is_err());
        assert!(handle_validate(&catalog, None, &manager()).is_ok());
    }
}
