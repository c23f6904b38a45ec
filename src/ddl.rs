//! DDL statement text for external tables
//!
//! Statements are plain strings; identical input always renders identical text.

use crate::definition::{Fields, PartitionKey, TypeDef};

/// SerDe clause shared by every table: objects are newline-delimited JSON
pub const ROW_FORMAT_SERDE: &str = "ROW FORMAT SERDE 'org.openx.data.jsonserde.JsonSerDe'";

/// Render a column type in the engine's type syntax
///
/// # Examples
///
/// ```
/// use athena_admin::ddl::render_type;
/// use athena_admin::TypeDef;
///
/// assert_eq!(render_type(&TypeDef::scalar("string")), "string");
/// assert_eq!(render_type(&TypeDef::array("string".into())), "array<string>");
/// let nested = TypeDef::structure([
///     ("a", TypeDef::scalar("int")),
///     ("b", TypeDef::array("string".into())),
/// ]);
/// assert_eq!(render_type(&nested), "struct<a:int,b:array<string>>");
/// ```
pub fn render_type(type_def: &TypeDef) -> String {
    match type_def {
        TypeDef::Scalar(name) => name.clone(),
        TypeDef::Array(element) => format!("array<{}>", render_type(element)),
        TypeDef::Struct(fields) => {
            let members = fields
                .iter()
                .map(|(name, t)| format!("{}:{}", name, render_type(t)))
                .collect::<Vec<_>>()
                .join(",");
            format!("struct<{members}>")
        }
    }
}

pub fn drop_table_if_exists(database: &str, table: &str) -> String {
    format!("DROP TABLE IF EXISTS {database}.{table}")
}

pub fn create_table(
    database: &str,
    table: &str,
    columns: &Fields,
    partition_keys: &[PartitionKey],
    location: &str,
) -> String {
    let columns = columns
        .iter()
        .map(|(name, t)| format!("{} {}", name, render_type(t)))
        .collect::<Vec<_>>()
        .join(",");
    let partitions = partition_keys
        .iter()
        .map(|k| format!("{} {}", k.name, k.key_type))
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "CREATE EXTERNAL TABLE {database}.{table} ({columns}) PARTITIONED BY({partitions}) {ROW_FORMAT_SERDE} LOCATION '{location}'"
    )
}

/// Registers partitions found under the table location
pub fn repair_table(database: &str, table: &str) -> String {
    format!("MSCK REPAIR TABLE {database}.{table}")
}
