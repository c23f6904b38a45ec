//! Typed database definition model
//!
//! A definition is the declarative description of one query-engine database: the
//! tables it holds, their columns, and how staged objects are laid out into
//! `name=value` partition paths. The same document, serialized, is the snapshot
//! persisted after a successful migration.

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Column type description
///
/// Serialized the way definition files write it: a bare string for scalars, a
/// one-element array for `array<...>`, and an object for `struct<...>`.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDef {
    /// Scalar type name, passed through verbatim (`string`, `int`, `timestamp`, ...)
    Scalar(String),
    /// `array<element>`
    Array(Box<TypeDef>),
    /// `struct<field:type,...>` in declared field order
    Struct(Fields),
}

impl TypeDef {
    pub fn scalar(name: impl Into<String>) -> Self {
        TypeDef::Scalar(name.into())
    }

    pub fn array(element: TypeDef) -> Self {
        TypeDef::Array(Box::new(element))
    }

    pub fn structure<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, TypeDef)>,
        K: Into<String>,
    {
        TypeDef::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<&str> for TypeDef {
    fn from(name: &str) -> Self {
        TypeDef::Scalar(name.to_string())
    }
}

impl Serialize for TypeDef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TypeDef::Scalar(name) => serializer.serialize_str(name),
            TypeDef::Array(element) => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element(element.as_ref())?;
                seq.end()
            }
            TypeDef::Struct(fields) => fields.serialize(serializer),
        }
    }
}

struct TypeDefVisitor;

impl<'de> Visitor<'de> for TypeDefVisitor {
    type Value = TypeDef;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a type name, a one-element array, or a struct object")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<TypeDef, E> {
        Ok(TypeDef::Scalar(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<TypeDef, E> {
        Ok(TypeDef::Scalar(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<TypeDef, A::Error> {
        let element: TypeDef = seq.next_element()?.ok_or_else(|| {
            <A::Error as de::Error>::invalid_length(0, &"an array type with exactly one element type")
        })?;
        if seq.next_element::<de::IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_length(
                2,
                &"an array type with exactly one element type",
            ));
        }
        Ok(TypeDef::Array(Box::new(element)))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<TypeDef, A::Error> {
        Fields::from_map_access(map).map(TypeDef::Struct)
    }
}

impl<'de> Deserialize<'de> for TypeDef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TypeDefVisitor)
    }
}

/// Named fields in declared order
///
/// Used for table columns and struct members. Iteration and serialization keep
/// insertion order (DDL rendering depends on it); equality does not, so two
/// definitions that list the same fields in a different order compare equal.
#[derive(Debug, Clone, Default)]
pub struct Fields(Vec<(String, TypeDef)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field, keeping the original position on replace
    pub fn insert(&mut self, name: impl Into<String>, type_def: TypeDef) -> Option<TypeDef> {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, type_def)),
            None => {
                self.0.push((name, type_def));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeDef)> {
        self.0.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn from_map_access<'de, A: MapAccess<'de>>(mut map: A) -> Result<Self, A::Error> {
        let mut fields = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((name, type_def)) = map.next_entry::<String, TypeDef>()? {
            if fields.iter().any(|(n, _): &(String, TypeDef)| *n == name) {
                return Err(de::Error::custom(format!("duplicate field `{name}`")));
            }
            fields.push((name, type_def));
        }
        Ok(Fields(fields))
    }
}

impl PartialEq for Fields {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(name, type_def)| other.get(name) == Some(type_def))
    }
}

impl<K: Into<String>> FromIterator<(K, TypeDef)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, TypeDef)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (name, type_def) in iter {
            fields.insert(name, type_def);
        }
        fields
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, type_def) in self.iter() {
            map.serialize_entry(name, type_def)?;
        }
        map.end()
    }
}

struct FieldsVisitor;

impl<'de> Visitor<'de> for FieldsVisitor {
    type Value = Fields;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping field names to types")
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Fields, A::Error> {
        Fields::from_map_access(map)
    }
}

impl<'de> Deserialize<'de> for Fields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FieldsVisitor)
    }
}

/// One partition dimension, rendered as a `name=value` path segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionKey {
    pub name: String,
    /// Query-engine type of the partition column
    #[serde(rename = "type")]
    pub key_type: String,
    /// Value template with 1-based capture placeholders, e.g. `{1}-{2}-{3}`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,
}

impl PartitionKey {
    pub fn new(name: impl Into<String>, key_type: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_type: key_type.into(),
            format: format.into(),
        }
    }

    /// Integer-typed keys render their value in canonical integer form
    pub fn is_integer(&self) -> bool {
        matches!(
            self.key_type.as_str(),
            "int" | "integer" | "bigint" | "smallint" | "tinyint"
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionSpec {
    pub keys: Vec<PartitionKey>,
    /// Staging location holding objects not yet laid out by partition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_partition_location: Option<String>,
    /// Pattern matched against staged keys, right after the staging prefix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regexp: Option<String>,
}

impl PartitionSpec {
    /// Staging location and pattern, when both are configured
    pub fn staging(&self) -> Option<(&str, &str)> {
        match (&self.pre_partition_location, &self.regexp) {
            (Some(location), Some(pattern)) => Some((location, pattern)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDefinition {
    pub columns: Fields,
    pub partition: PartitionSpec,
    pub src_location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct General {
    pub database_name: String,
    #[serde(alias = "athenaRegion")]
    pub engine_region: String,
    #[serde(alias = "saveDefinitionLocation")]
    pub snapshot_location: String,
}

/// A whole database: connection parameters plus its tables by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseDefinition {
    pub general: General,
    #[serde(default)]
    pub tables: BTreeMap<String, TableDefinition>,
}
