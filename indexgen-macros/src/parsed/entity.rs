use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::spanned::Spanned;
use syn::{Attribute, Data, DeriveInput, Error, Fields, Ident, LitStr, Result};

use super::{ParsedField, RelationSpec};

pub(crate) struct ParsedEntity {
    name: Ident,
    display_name: String,
    fields: Vec<ParsedField>,
    /// Container-level relations, declared without a backing field.
    relations: Vec<RelationSpec>,
}

impl ParsedEntity {
    pub(crate) fn from_input(input: &DeriveInput) -> Result<Self> {
        if !input.generics.params.is_empty() {
            return Err(Error::new(
                input.generics.span(),
                "IndexEntity cannot be derived for generic structs",
            ));
        }

        let mut display_name: Option<String> = None;
        let mut relations = Vec::new();
        for attr in &input.attrs {
            if attr.path().is_ident("index") {
                Self::parse_container_attr(attr, &mut display_name, &mut relations)?;
            }
        }

        let fields = match &input.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(named) => named
                    .named
                    .iter()
                    .map(ParsedField::from_field)
                    .collect::<Result<Vec<_>>>()?,
                _ => return Err(Error::new(input.ident.span(), "IndexEntity requires named fields")),
            },
            _ => return Err(Error::new(input.ident.span(), "IndexEntity can only be derived for structs")),
        };

        let mut primary_key: Option<&ParsedField> = None;
        for field in &fields {
            if field.primary_key {
                if primary_key.is_some() {
                    return Err(Error::new(
                        field.ident.span(),
                        "IndexEntity allows exactly one #[index(primary_key)] field",
                    ));
                }
                primary_key = Some(field);
            }
        }
        if primary_key.is_none() {
            return Err(Error::new(
                input.ident.span(),
                "IndexEntity requires a field annotated with #[index(primary_key)]",
            ));
        }

        for relation in &relations {
            if relation.name.is_none() {
                return Err(Error::new(
                    relation.span,
                    "container-level relations need a name = \"...\"",
                ));
            }
        }

        let display_name = display_name.unwrap_or_else(|| split_words(&input.ident.to_string()));
        if display_name.trim().is_empty() {
            return Err(Error::new(input.ident.span(), "display_name must not be empty"));
        }

        Ok(Self {
            name: input.ident.clone(),
            display_name,
            fields,
            relations,
        })
    }

    fn parse_container_attr(
        attr: &Attribute,
        display_name: &mut Option<String>,
        relations: &mut Vec<RelationSpec>,
    ) -> Result<()> {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("display_name") {
                let value: LitStr = meta.value()?.parse()?;
                *display_name = Some(value.value());
            } else if meta.path.is_ident("relation") {
                relations.push(RelationSpec::parse(&meta)?);
            } else {
                return Err(meta.error("unknown index attribute, expected display_name or relation"));
            }
            Ok(())
        })
    }

    pub(crate) fn emit(&self) -> TokenStream2 {
        let name = &self.name;
        let entity_lit = LitStr::new(&name.to_string(), Span::call_site());
        let display_lit = LitStr::new(&self.display_name, Span::call_site());

        let scalar_inits = self.fields.iter().filter(|field| !field.skip).filter_map(|field| {
            let storage = field.storage.as_ref()?;
            let field_lit = LitStr::new(&field.name, Span::call_site());
            let nullable = field.nullable;
            let primary_key = field.primary_key;
            Some(quote! {
                ::indexgen::FieldDescriptor::new(#entity_lit, #field_lit, #storage)
                    .with_nullable(#nullable)
                    .with_primary_key(#primary_key)
            })
        });

        let field_relations = self.fields.iter().filter(|field| !field.skip).filter_map(|field| {
            let relation = field.relation.as_ref()?;
            let relation_name = relation.name.clone().unwrap_or_else(|| field.name.clone());
            let nullable = relation.nullable.unwrap_or(field.nullable);
            Some(relation_tokens(&entity_lit, relation, &relation_name, nullable))
        });
        let container_relations = self.relations.iter().map(|relation| {
            let relation_name = relation.name.clone().unwrap_or_default();
            relation_tokens(&entity_lit, relation, &relation_name, relation.nullable.unwrap_or(false))
        });
        let relation_inits: Vec<TokenStream2> = field_relations.chain(container_relations).collect();

        quote! {
            impl ::indexgen::IndexEntity for #name {
                const ENTITY_NAME: &'static str = #entity_lit;
                const DISPLAY_NAME: &'static str = #display_lit;

                fn scalar_fields() -> ::std::vec::Vec<::indexgen::FieldDescriptor> {
                    ::std::vec![#(#scalar_inits),*]
                }

                fn relations() -> ::indexgen::SchemaResult<::std::vec::Vec<::indexgen::RelationDescriptor>> {
                    ::std::result::Result::Ok(::std::vec![#(#relation_inits),*])
                }
            }

            ::indexgen::inventory::submit! {
                ::indexgen::EntityRegistration {
                    type_id_fn: ::std::any::TypeId::of::<#name>,
                    entity_name: #entity_lit,
                    display_name: #display_lit,
                    descriptor_fn: <#name as ::indexgen::IndexEntity>::entity_descriptor,
                }
            }
        }
    }
}

fn relation_tokens(entity_lit: &LitStr, relation: &RelationSpec, relation_name: &str, nullable: bool) -> TokenStream2 {
    let target = &relation.target;
    let kind = relation.kind.to_tokens();
    let name_lit = LitStr::new(relation_name, Span::call_site());
    let composite = relation.composite;
    let target_field = match &relation.target_field {
        Some(field) => {
            let lit = LitStr::new(field, Span::call_site());
            quote! { ::std::option::Option::Some(#lit) }
        }
        None => quote! { ::std::option::Option::None },
    };
    quote! {
        ::indexgen::RelationDescriptor::for_target::<#target>(#entity_lit, #name_lit, #kind, #target_field)?
            .with_composite(#composite)
            .with_nullable(#nullable)
    }
}

/// `"JoinOnAnotherField"` -> `"join on another field"`.
fn split_words(ident: &str) -> String {
    let mut result = String::new();
    let mut previous_lower = false;
    for ch in ident.chars() {
        if ch.is_uppercase() && previous_lower {
            result.push(' ');
        }
        previous_lower = ch.is_lowercase() || ch.is_ascii_digit();
        result.extend(ch.to_lowercase());
    }
    result
}
