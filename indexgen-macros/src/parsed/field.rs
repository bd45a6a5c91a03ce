use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::{Attribute, Error, Field, GenericArgument, Ident, LitInt, LitStr, Path, PathArguments, Result, Type};
use syn::spanned::Spanned;

/// Storage labels accepted by `#[index(storage = "...")]` and their variants.
const STORAGE_LABELS: &[(&str, &str)] = &[
    ("int8", "Int8"),
    ("int16", "Int16"),
    ("int32", "Int32"),
    ("int64", "Int64"),
    ("uint8", "UInt8"),
    ("uint16", "UInt16"),
    ("uint32", "UInt32"),
    ("uint64", "UInt64"),
    ("float", "Float"),
    ("boolean", "Boolean"),
    ("char", "Char"),
    ("text", "Text"),
    ("slug", "Slug"),
    ("email", "Email"),
    ("url", "Url"),
    ("ip_address", "IpAddress"),
    ("uuid", "Uuid"),
    ("file_path", "FilePath"),
    ("json", "Json"),
    ("date", "Date"),
    ("date_time", "DateTime"),
    ("time", "Time"),
    ("duration", "Duration"),
    ("binary", "Binary"),
    ("file", "File"),
    ("image", "Image"),
];

#[derive(Clone, Copy)]
pub(crate) enum RelationKind {
    HasMany,
    ManyToMany,
    BelongsTo,
}

impl RelationKind {
    pub(crate) fn to_tokens(self) -> TokenStream2 {
        match self {
            RelationKind::HasMany => quote! { ::indexgen::RelationKind::HasMany },
            RelationKind::ManyToMany => quote! { ::indexgen::RelationKind::ManyToMany },
            RelationKind::BelongsTo => quote! { ::indexgen::RelationKind::BelongsTo },
        }
    }
}

/// A relation declared with `relation(belongs_to | has_many | many_to_many = Target, ...)`.
pub(crate) struct RelationSpec {
    pub kind: RelationKind,
    pub target: Path,
    pub name: Option<String>,
    pub target_field: Option<String>,
    pub composite: bool,
    pub nullable: Option<bool>,
    pub span: Span,
}

impl RelationSpec {
    pub(crate) fn parse(meta: &ParseNestedMeta) -> Result<Self> {
        let mut kind_and_target: Option<(RelationKind, Path)> = None;
        let mut name = None;
        let mut target_field = None;
        let mut composite = false;
        let mut nullable = None;

        meta.parse_nested_meta(|nested| {
            let kind = if nested.path.is_ident("belongs_to") {
                Some(RelationKind::BelongsTo)
            } else if nested.path.is_ident("has_many") {
                Some(RelationKind::HasMany)
            } else if nested.path.is_ident("many_to_many") {
                Some(RelationKind::ManyToMany)
            } else {
                None
            };

            if let Some(kind) = kind {
                if kind_and_target.is_some() {
                    return Err(nested.error("relation kind already specified"));
                }
                let target: Path = nested.value()?.parse()?;
                kind_and_target = Some((kind, target));
            } else if nested.path.is_ident("name") {
                let value: LitStr = nested.value()?.parse()?;
                name = Some(value.value());
            } else if nested.path.is_ident("target_field") {
                let value: LitStr = nested.value()?.parse()?;
                target_field = Some(value.value());
            } else if nested.path.is_ident("composite") {
                composite = true;
            } else if nested.path.is_ident("nullable") {
                nullable = Some(true);
            } else {
                return Err(nested.error(
                    "unknown relation attribute, expected belongs_to, has_many, many_to_many, name, target_field, composite, or nullable",
                ));
            }
            Ok(())
        })?;

        let (kind, target) = kind_and_target
            .ok_or_else(|| meta.error("relation requires one of belongs_to = T, has_many = T, or many_to_many = T"))?;

        Ok(Self {
            kind,
            target,
            name,
            target_field,
            composite,
            nullable,
            span: meta.path.span(),
        })
    }
}

pub(crate) struct ParsedField {
    pub ident: Ident,
    pub name: String,
    pub nullable: bool,
    pub primary_key: bool,
    pub skip: bool,
    /// `::indexgen::StorageType` expression; `None` for skipped and relation fields.
    pub storage: Option<TokenStream2>,
    pub relation: Option<RelationSpec>,
}

impl ParsedField {
    pub(crate) fn from_field(field: &Field) -> Result<Self> {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| Error::new(field.span(), "IndexEntity requires named fields"))?;
        let name = ident.to_string();
        let (nullable, inner) = match unwrap_generic(&field.ty, "Option") {
            Some(inner) => (true, inner),
            None => (false, &field.ty),
        };

        let mut primary_key = false;
        let mut skip = false;
        let mut explicit_storage: Option<TokenStream2> = None;
        let mut relation: Option<RelationSpec> = None;

        for attr in &field.attrs {
            if attr.path().is_ident("index") {
                Self::parse_field_attr(attr, &mut primary_key, &mut skip, &mut explicit_storage, &mut relation)?;
            }
        }

        if primary_key && nullable {
            return Err(Error::new(ident.span(), "#[index(primary_key)] cannot be applied to an Option<T>"));
        }
        if primary_key && (skip || relation.is_some()) {
            return Err(Error::new(
                ident.span(),
                "#[index(primary_key)] cannot be combined with skip or relation",
            ));
        }

        let storage = if skip || relation.is_some() {
            None
        } else if let Some(storage) = explicit_storage {
            Some(storage)
        } else {
            Some(infer_storage(inner).ok_or_else(|| {
                Error::new(
                    field.ty.span(),
                    format!(
                        "cannot infer storage type of `{name}`; add #[index(storage = \"...\")], \
                         #[index(decimal(precision = .., scale = ..))] or #[index(skip)]"
                    ),
                )
            })?)
        };

        Ok(Self {
            ident,
            name,
            nullable,
            primary_key,
            skip,
            storage,
            relation,
        })
    }

    fn parse_field_attr(
        attr: &Attribute,
        primary_key: &mut bool,
        skip: &mut bool,
        storage: &mut Option<TokenStream2>,
        relation: &mut Option<RelationSpec>,
    ) -> Result<()> {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("primary_key") {
                if *primary_key {
                    return Err(meta.error("field already marked as #[index(primary_key)]"));
                }
                *primary_key = true;
            } else if meta.path.is_ident("skip") {
                *skip = true;
            } else if meta.path.is_ident("storage") {
                if storage.is_some() {
                    return Err(meta.error("storage type already specified"));
                }
                let value: LitStr = meta.value()?.parse()?;
                *storage = Some(storage_from_label(&value)?);
            } else if meta.path.is_ident("decimal") {
                if storage.is_some() {
                    return Err(meta.error("storage type already specified"));
                }
                *storage = Some(parse_decimal(&meta)?);
            } else if meta.path.is_ident("relation") {
                if relation.is_some() {
                    return Err(meta.error("field already has a relation attribute"));
                }
                *relation = Some(RelationSpec::parse(&meta)?);
            } else {
                return Err(meta.error(
                    "unknown index attribute, expected primary_key, skip, storage, decimal, or relation",
                ));
            }
            Ok(())
        })
    }
}

fn storage_from_label(value: &LitStr) -> Result<TokenStream2> {
    let label = value.value();
    if label == "decimal" {
        return Err(Error::new(
            value.span(),
            "decimal storage needs #[index(decimal(precision = .., scale = ..))]",
        ));
    }
    let variant = STORAGE_LABELS
        .iter()
        .find(|(candidate, _)| *candidate == label)
        .map(|(_, variant)| Ident::new(variant, Span::call_site()))
        .ok_or_else(|| Error::new(value.span(), format!("unknown storage type `{label}`")))?;
    Ok(quote! { ::indexgen::StorageType::#variant })
}

fn parse_decimal(meta: &ParseNestedMeta) -> Result<TokenStream2> {
    let mut precision: Option<u32> = None;
    let mut scale: Option<u32> = None;
    meta.parse_nested_meta(|nested| {
        if nested.path.is_ident("precision") {
            let value: LitInt = nested.value()?.parse()?;
            precision = Some(value.base10_parse()?);
        } else if nested.path.is_ident("scale") {
            let value: LitInt = nested.value()?.parse()?;
            scale = Some(value.base10_parse()?);
        } else {
            return Err(nested.error("unknown decimal attribute, expected precision or scale"));
        }
        Ok(())
    })?;
    let precision = precision.ok_or_else(|| meta.error("decimal requires precision"))?;
    let scale = scale.ok_or_else(|| meta.error("decimal requires scale"))?;
    if precision == 0 || precision < scale {
        return Err(meta.error("decimal precision must be positive and at least the scale"));
    }
    Ok(quote! { ::indexgen::StorageType::Decimal { precision: #precision, scale: #scale } })
}

fn unwrap_generic<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => args.args.first().and_then(|arg| match arg {
            GenericArgument::Type(inner) => Some(inner),
            _ => None,
        }),
        _ => None,
    }
}

/// Maps a Rust type to the storage variant it is stored as.
fn infer_storage(ty: &Type) -> Option<TokenStream2> {
    if let Type::Reference(reference) = ty {
        return infer_storage(&reference.elem);
    }
    if let Some(element) = unwrap_generic(ty, "Vec") {
        let is_bytes = matches!(element, Type::Path(path) if path.path.is_ident("u8"));
        return is_bytes.then(|| quote! { ::indexgen::StorageType::Binary });
    }
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    let variant = match segment.ident.to_string().as_str() {
        "i8" => "Int8",
        "i16" => "Int16",
        "i32" => "Int32",
        "i64" | "isize" => "Int64",
        "u8" => "UInt8",
        "u16" => "UInt16",
        "u32" => "UInt32",
        "u64" | "usize" => "UInt64",
        "f32" | "f64" => "Float",
        "bool" => "Boolean",
        "char" => "Char",
        "String" | "str" => "Text",
        "Uuid" => "Uuid",
        "Url" => "Url",
        "IpAddr" | "Ipv4Addr" | "Ipv6Addr" => "IpAddress",
        "PathBuf" | "Path" => "FilePath",
        "Value" => "Json",
        "NaiveDate" => "Date",
        "NaiveDateTime" | "DateTime" => "DateTime",
        "NaiveTime" => "Time",
        "Duration" => "Duration",
        _ => return None,
    };
    let variant = Ident::new(variant, Span::call_site());
    Some(quote! { ::indexgen::StorageType::#variant })
}
