use once_cell::sync::Lazy;
use regex::Regex;

static CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("camel-case boundary pattern compiles"));

/// Normalizes a display name into a collection name.
///
/// `"Geo Point"`, `"GeoPoint"` and `"geo-point"` all become `"geo_point"`.
pub fn collection_name(display_name: &str) -> String {
    let split = CAMEL_BOUNDARY.replace_all(display_name.trim(), "$1 $2");
    split
        .to_lowercase()
        .replace(['-', '.'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Turns a struct identifier into lowercase words, `"JoinOnAnotherField"` -> `"join on another field"`.
pub fn display_name(ident: &str) -> String {
    CAMEL_BOUNDARY.replace_all(ident, "$1 $2").to_lowercase()
}
