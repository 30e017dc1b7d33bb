//! # Keystone Core
//!
//! Identifier model shared by the credential and event crates.
//!
//! ## Key Components
//!
//! - **NameIdentifier**: hierarchical `metalake.catalog.schema.table` path
//! - **MetadataObject**: a typed object reference (`catalog.schema.table` + kind)
//! - **to_entity_ident**: deterministic mapping from (metalake, object) to identifier
//!
//! ## Usage
//!
//! ```rust
//! use keystone_core::{MetadataObject, MetadataObjectType, to_entity_ident};
//!
//! let table = MetadataObject::new("hive.sales.orders", MetadataObjectType::Table).unwrap();
//! let ident = to_entity_ident("acme", &table).unwrap();
//! assert_eq!(ident.to_string(), "acme.hive.sales.orders");
//! ```

#![forbid(unsafe_code)]

mod error;
pub mod identifier;
pub mod metadata_object;

pub use error::IdentifierError;
pub use identifier::{NameIdentifier, Namespace};
pub use metadata_object::{MetadataObject, MetadataObjectType, to_entity_ident};

/// Result type used by the identifier model.
pub type Result<T> = std::result::Result<T, IdentifierError>;

/// Catalog name reserved for service-owned entities (tags, roles).
pub const SYSTEM_CATALOG: &str = "system";

/// Schema holding tag entities under [`SYSTEM_CATALOG`].
pub const TAG_SCHEMA: &str = "tag";

/// Schema holding role entities under [`SYSTEM_CATALOG`].
pub const ROLE_SCHEMA: &str = "role";
