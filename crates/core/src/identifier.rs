//! Hierarchical names for catalog entities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::IdentifierError;

/// Separator used when rendering identifiers as a single string.
pub const SEPARATOR: char = '.';

/// Ordered parent levels of a [`NameIdentifier`].
///
/// An empty namespace is valid and denotes a top-level entity (a metalake).
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Namespace(Vec<String>);

impl Namespace {
    /// Build a namespace from levels, rejecting blank ones.
    pub fn of<I, S>(levels: I) -> Result<Self, IdentifierError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let levels: Vec<String> = levels.into_iter().map(Into::into).collect();
        if let Some(index) = levels.iter().position(|l| l.trim().is_empty()) {
            return Err(IdentifierError::BlankLevel { index });
        }
        Ok(Self(levels))
    }

    /// The empty namespace.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Levels in order, outermost first.
    pub fn levels(&self) -> &[String] {
        &self.0
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the namespace has no levels.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Fully qualified name of a catalog entity, e.g. `metalake.catalog.schema.table`.
///
/// Serialises as its dotted string form.
///
/// # Examples
///
/// ```
/// use keystone_core::NameIdentifier;
///
/// let ident = NameIdentifier::of(["acme", "hive", "sales"]).unwrap();
/// assert_eq!(ident.name(), "sales");
/// assert_eq!(ident.namespace().to_string(), "acme.hive");
/// assert_eq!(ident.to_string(), "acme.hive.sales");
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NameIdentifier {
    namespace: Namespace,
    name: String,
}

impl NameIdentifier {
    /// Build an identifier from all of its levels; the last one is the name.
    pub fn of<I, S>(levels: I) -> Result<Self, IdentifierError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut levels = Namespace::of(levels)?.0;
        let name = levels.pop().ok_or(IdentifierError::Empty)?;
        Ok(Self {
            namespace: Namespace(levels),
            name,
        })
    }

    /// Build an identifier from an existing namespace and a leaf name.
    pub fn new(namespace: Namespace, name: impl Into<String>) -> Result<Self, IdentifierError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(IdentifierError::BlankLevel {
                index: namespace.len(),
            });
        }
        Ok(Self { namespace, name })
    }

    /// Parent levels.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Leaf name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total depth including the leaf.
    pub fn depth(&self) -> usize {
        self.namespace.len() + 1
    }

    /// All levels, outermost first, leaf last.
    pub fn levels(&self) -> impl Iterator<Item = &str> {
        self.namespace
            .levels()
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.name.as_str()))
    }
}

impl fmt::Display for NameIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}{SEPARATOR}{}", self.namespace, self.name)
        }
    }
}

impl FromStr for NameIdentifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(IdentifierError::Empty);
        }
        Self::of(s.split(SEPARATOR))
    }
}

impl TryFrom<String> for NameIdentifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NameIdentifier> for String {
    fn from(value: NameIdentifier) -> Self {
        value.to_string()
    }
}
