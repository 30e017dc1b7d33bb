use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// What a requested credential must be able to reach.
///
/// Part of the cache key: two requests share a cached credential only when
/// their scopes are equal. Path sets are ordered so equal scopes hash equally
/// regardless of the order callers listed them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CredentialScope {
    /// Everything the catalog's storage configuration grants
    #[default]
    Catalog,
    /// Only the listed locations
    Paths {
        /// Locations that may be read
        #[serde(default)]
        read: BTreeSet<String>,
        /// Locations that may be read and written
        #[serde(default)]
        write: BTreeSet<String>,
    },
}

impl CredentialScope {
    /// Scope limited to the given read and write locations.
    pub fn paths<R, W>(read: R, write: W) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        W: IntoIterator,
        W::Item: Into<String>,
    {
        Self::Paths {
            read: read.into_iter().map(Into::into).collect(),
            write: write.into_iter().map(Into::into).collect(),
        }
    }

    /// Read-only scope over the given locations.
    pub fn read_only<R>(read: R) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self::paths(read, std::iter::empty::<String>())
    }

    /// Whether this scope covers the whole catalog.
    pub fn is_catalog(&self) -> bool {
        matches!(self, Self::Catalog)
    }
}

impl fmt::Display for CredentialScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog => f.write_str("catalog"),
            Self::Paths { read, write } => {
                write!(f, "paths(read={}, write={})", read.len(), write.len())
            }
        }
    }
}
