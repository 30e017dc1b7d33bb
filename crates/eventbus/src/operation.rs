//! Catalog operation types.
//!
//! The set is open but append-only: every variant carries a stable numeric
//! code and wire name. Codes are grouped by resource family (`1xx` metalake,
//! `2xx` catalog, ...). New operations take the next free code of their family;
//! existing codes are never renumbered or reused.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EventError;

macro_rules! operation_types {
    ($( $(#[$meta:meta])* $variant:ident = $code:literal => $wire:literal ),+ $(,)?) => {
        /// The catalog operation an event reports on.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        #[non_exhaustive]
        pub enum OperationType {
            $( $(#[$meta])* $variant, )+
        }

        impl OperationType {
            /// Every operation type, in code order.
            pub const ALL: &'static [Self] = &[ $( Self::$variant ),+ ];

            /// Stable numeric code.
            pub const fn code(self) -> u16 {
                match self {
                    $( Self::$variant => $code, )+
                }
            }

            /// Stable wire name, e.g. `LIST_TAGS_INFO_FOR_METADATA_OBJECT`.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $wire, )+
                }
            }

            /// Look an operation type up by its code.
            pub const fn from_code(code: u16) -> Option<Self> {
                match code {
                    $( $code => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

operation_types! {
    // metalake
    CreateMetalake = 100 => "CREATE_METALAKE",
    AlterMetalake = 101 => "ALTER_METALAKE",
    DropMetalake = 102 => "DROP_METALAKE",
    LoadMetalake = 103 => "LOAD_METALAKE",
    ListMetalake = 104 => "LIST_METALAKE",

    // catalog
    CreateCatalog = 200 => "CREATE_CATALOG",
    AlterCatalog = 201 => "ALTER_CATALOG",
    DropCatalog = 202 => "DROP_CATALOG",
    LoadCatalog = 203 => "LOAD_CATALOG",
    ListCatalog = 204 => "LIST_CATALOG",
    /// List catalogs together with their properties
    ListCatalogInfo = 205 => "LIST_CATALOG_INFO",
    TestConnection = 206 => "TEST_CONNECTION",

    // schema
    CreateSchema = 300 => "CREATE_SCHEMA",
    AlterSchema = 301 => "ALTER_SCHEMA",
    DropSchema = 302 => "DROP_SCHEMA",
    LoadSchema = 303 => "LOAD_SCHEMA",
    ListSchema = 304 => "LIST_SCHEMA",

    // table
    CreateTable = 400 => "CREATE_TABLE",
    AlterTable = 401 => "ALTER_TABLE",
    DropTable = 402 => "DROP_TABLE",
    /// Drop a table and delete its data
    PurgeTable = 403 => "PURGE_TABLE",
    LoadTable = 404 => "LOAD_TABLE",
    ListTable = 405 => "LIST_TABLE",

    // fileset
    CreateFileset = 500 => "CREATE_FILESET",
    AlterFileset = 501 => "ALTER_FILESET",
    DropFileset = 502 => "DROP_FILESET",
    LoadFileset = 503 => "LOAD_FILESET",
    ListFileset = 504 => "LIST_FILESET",
    /// Resolve the actual storage location of a fileset path
    GetFilesetContext = 505 => "GET_FILESET_CONTEXT",
    ListFiles = 506 => "LIST_FILES",

    // topic
    CreateTopic = 600 => "CREATE_TOPIC",
    AlterTopic = 601 => "ALTER_TOPIC",
    DropTopic = 602 => "DROP_TOPIC",
    LoadTopic = 603 => "LOAD_TOPIC",
    ListTopic = 604 => "LIST_TOPIC",

    // model
    RegisterModel = 700 => "REGISTER_MODEL",
    GetModel = 701 => "GET_MODEL",
    DeleteModel = 702 => "DELETE_MODEL",
    ListModel = 703 => "LIST_MODEL",
    AlterModel = 704 => "ALTER_MODEL",
    LinkModelVersion = 705 => "LINK_MODEL_VERSION",
    GetModelVersion = 706 => "GET_MODEL_VERSION",
    DeleteModelVersion = 707 => "DELETE_MODEL_VERSION",
    ListModelVersions = 708 => "LIST_MODEL_VERSIONS",

    // partition
    AddPartition = 800 => "ADD_PARTITION",
    DropPartition = 801 => "DROP_PARTITION",
    GetPartition = 802 => "GET_PARTITION",
    PurgePartition = 803 => "PURGE_PARTITION",
    ListPartition = 804 => "LIST_PARTITION",
    ListPartitionNames = 805 => "LIST_PARTITION_NAMES",
    PartitionExists = 806 => "PARTITION_EXISTS",

    // tag
    CreateTag = 900 => "CREATE_TAG",
    AlterTag = 901 => "ALTER_TAG",
    DeleteTag = 902 => "DELETE_TAG",
    GetTag = 903 => "GET_TAG",
    ListTag = 904 => "LIST_TAG",
    ListTagsInfo = 905 => "LIST_TAGS_INFO",
    GetTagForMetadataObject = 906 => "GET_TAG_FOR_METADATA_OBJECT",
    ListTagsForMetadataObject = 907 => "LIST_TAGS_FOR_METADATA_OBJECT",
    /// List the tags, with their details, attached to one metadata object
    ListTagsInfoForMetadataObject = 908 => "LIST_TAGS_INFO_FOR_METADATA_OBJECT",
    ListMetadataObjectsForTag = 909 => "LIST_METADATA_OBJECTS_FOR_TAG",
    AssociateTagsForMetadataObject = 910 => "ASSOCIATE_TAGS_FOR_METADATA_OBJECT",

    // credential
    /// Vend storage credentials for a catalog object
    GetCredentials = 1000 => "GET_CREDENTIALS",
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the wire name case-insensitively; `-` is accepted for `_`, so
/// `list-tags-info-for-metadata-object` names the same operation.
impl FromStr for OperationType {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|operation| operation.as_str() == normalized)
            .ok_or_else(|| EventError::UnknownOperationType(s.to_string()))
    }
}

impl TryFrom<String> for OperationType {
    type Error = EventError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OperationType> for &'static str {
    fn from(value: OperationType) -> Self {
        value.as_str()
    }
}
