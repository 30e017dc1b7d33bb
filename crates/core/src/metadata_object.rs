//! Typed references to catalog objects and their mapping to identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identifier::SEPARATOR;
use crate::{IdentifierError, NameIdentifier, ROLE_SCHEMA, SYSTEM_CATALOG, TAG_SCHEMA};

/// Kind of a catalog object.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum MetadataObjectType {
    /// Top-level tenant namespace
    Metalake,
    /// A catalog inside a metalake
    Catalog,
    /// A schema inside a catalog
    Schema,
    /// A table inside a schema
    Table,
    /// A fileset inside a schema
    Fileset,
    /// A message topic inside a schema
    Topic,
    /// A model inside a schema
    Model,
    /// A column of a table
    Column,
    /// A tag, owned by the metalake
    Tag,
    /// A role, owned by the metalake
    Role,
}

impl MetadataObjectType {
    /// Number of dot-separated levels in a full name of this type.
    pub const fn levels(self) -> usize {
        match self {
            Self::Metalake | Self::Catalog | Self::Tag | Self::Role => 1,
            Self::Schema => 2,
            Self::Table | Self::Fileset | Self::Topic | Self::Model => 3,
            Self::Column => 4,
        }
    }

    /// Stable upper-case name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Metalake => "METALAKE",
            Self::Catalog => "CATALOG",
            Self::Schema => "SCHEMA",
            Self::Table => "TABLE",
            Self::Fileset => "FILESET",
            Self::Topic => "TOPIC",
            Self::Model => "MODEL",
            Self::Column => "COLUMN",
            Self::Tag => "TAG",
            Self::Role => "ROLE",
        }
    }
}

impl fmt::Display for MetadataObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to one catalog object: its dotted full name plus its type.
///
/// The full name is relative to the metalake (`catalog.schema.table`), and its
/// depth is checked against the type at construction.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataObject {
    full_name: String,
    #[serde(rename = "type")]
    object_type: MetadataObjectType,
}

impl MetadataObject {
    /// Create a reference, validating the depth of `full_name`.
    pub fn new(
        full_name: impl Into<String>,
        object_type: MetadataObjectType,
    ) -> Result<Self, IdentifierError> {
        let full_name = full_name.into();
        let levels: Vec<&str> = full_name.split(SEPARATOR).collect();
        if let Some(index) = levels.iter().position(|l| l.trim().is_empty()) {
            return Err(IdentifierError::BlankLevel { index });
        }
        if levels.len() != object_type.levels() {
            return Err(IdentifierError::LevelMismatch {
                object_type,
                expected: object_type.levels(),
                actual: levels.len(),
                full_name,
            });
        }
        Ok(Self {
            full_name,
            object_type,
        })
    }

    /// Dotted name relative to the metalake.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Object type.
    pub fn object_type(&self) -> MetadataObjectType {
        self.object_type
    }

    /// Last level of the full name.
    pub fn name(&self) -> &str {
        self.full_name
            .rsplit(SEPARATOR)
            .next()
            .unwrap_or(&self.full_name)
    }

    /// Everything before the last level, if any.
    pub fn parent(&self) -> Option<&str> {
        self.full_name
            .rsplit_once(SEPARATOR)
            .map(|(parent, _)| parent)
    }
}

impl fmt::Display for MetadataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.object_type, self.full_name)
    }
}

/// Map `(metalake, object)` to the identifier the catalog uses for that entity.
///
/// The mapping is deterministic so events and credentials for the same object
/// always correlate:
///
/// | type | identifier |
/// |---|---|
/// | metalake | `metalake` |
/// | tag | `metalake.system.tag.<name>` |
/// | role | `metalake.system.role.<name>` |
/// | anything else | `metalake.<full_name>` |
pub fn to_entity_ident(
    metalake: &str,
    object: &MetadataObject,
) -> Result<NameIdentifier, IdentifierError> {
    match object.object_type() {
        MetadataObjectType::Metalake => NameIdentifier::of([metalake]),
        MetadataObjectType::Tag => {
            NameIdentifier::of([metalake, SYSTEM_CATALOG, TAG_SCHEMA, object.name()])
        }
        MetadataObjectType::Role => {
            NameIdentifier::of([metalake, SYSTEM_CATALOG, ROLE_SCHEMA, object.name()])
        }
        _ => NameIdentifier::of(
            std::iter::once(metalake).chain(object.full_name().split(SEPARATOR)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("hive", MetadataObjectType::Catalog, "acme.hive")]
    #[case("hive.sales", MetadataObjectType::Schema, "acme.hive.sales")]
    #[case("hive.sales.orders", MetadataObjectType::Table, "acme.hive.sales.orders")]
    #[case("fs.raw.events", MetadataObjectType::Fileset, "acme.fs.raw.events")]
    #[case("kafka.default.clicks", MetadataObjectType::Topic, "acme.kafka.default.clicks")]
    #[case("hive.sales.orders.id", MetadataObjectType::Column, "acme.hive.sales.orders.id")]
    #[case("pii", MetadataObjectType::Tag, "acme.system.tag.pii")]
    #[case("admin", MetadataObjectType::Role, "acme.system.role.admin")]
    #[case("acme", MetadataObjectType::Metalake, "acme")]
    fn maps_objects_to_entity_identifiers(
        #[case] full_name: &str,
        #[case] object_type: MetadataObjectType,
        #[case] expected: &str,
    ) {
        let object = MetadataObject::new(full_name, object_type).unwrap();
        let ident = to_entity_ident("acme", &object).unwrap();
        assert_eq!(ident.to_string(), expected);
    }

    #[test]
    fn mapping_is_deterministic() {
        let a = MetadataObject::new("hive.sales.orders", MetadataObjectType::Table).unwrap();
        let b = MetadataObject::new("hive.sales.orders", MetadataObjectType::Table).unwrap();
        assert_eq!(
            to_entity_ident("acme", &a).unwrap(),
            to_entity_ident("acme", &b).unwrap()
        );
    }

    #[test]
    fn rejects_wrong_depth() {
        let err = MetadataObject::new("hive.sales", MetadataObjectType::Table).unwrap_err();
        assert_eq!(
            err,
            IdentifierError::LevelMismatch {
                object_type: MetadataObjectType::Table,
                full_name: "hive.sales".to_string(),
                expected: 3,
                actual: 2,
            }
        );
    }

    #[test]
    fn rejects_blank_metalake() {
        let object = MetadataObject::new("hive", MetadataObjectType::Catalog).unwrap();
        assert_eq!(
            to_entity_ident(" ", &object),
            Err(IdentifierError::BlankLevel { index: 0 })
        );
    }

    #[test]
    fn name_and_parent() {
        let object = MetadataObject::new("hive.sales.orders", MetadataObjectType::Table).unwrap();
        assert_eq!(object.name(), "orders");
        assert_eq!(object.parent(), Some("hive.sales"));

        let catalog = MetadataObject::new("hive", MetadataObjectType::Catalog).unwrap();
        assert_eq!(catalog.parent(), None);
    }
}
