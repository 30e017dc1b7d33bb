//! Immutable storage credentials
//!
//! A [`Credential`] is a validated `(kind, expiry, payload)` triple. It is
//! never mutated after construction; re-issuing produces a new value. Clones
//! share one allocation, and the payload is zeroized when the last clone is
//! dropped.

pub mod builtin;
mod dto;
mod kind;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use zeroize::Zeroize;

pub use dto::CredentialDto;
pub use kind::{CredentialKind, ExpiryPolicy, KindRegistry};

use crate::core::ValidationError;

const REDACTED: &str = "<redacted>";

/// A validated, immutable credential.
///
/// `Debug` prints the kind, expiry and payload keys; values are redacted.
#[derive(Clone)]
pub struct Credential {
    inner: Arc<Inner>,
}

struct Inner {
    kind: Arc<dyn CredentialKind>,
    expire_time_ms: i64,
    info: BTreeMap<String, String>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        for value in self.info.values_mut() {
            value.zeroize();
        }
    }
}

impl Credential {
    /// Validate `info` and `expire_time_ms` against `kind` and build a credential.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the payload or expiry violates the kind.
    pub fn new(
        kind: Arc<dyn CredentialKind>,
        info: BTreeMap<String, String>,
        expire_time_ms: i64,
    ) -> Result<Self, ValidationError> {
        let inner = Inner {
            kind,
            expire_time_ms,
            info,
        };
        // `inner` owns the payload from here, so it is zeroized on the error path too.
        inner.kind.validate(inner.expire_time_ms, &inner.info)?;
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Rebuild a credential from its wire parts, resolving `kind` by name.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownKind`] for unregistered kinds and any
    /// validation error of the resolved kind.
    pub fn initialize(
        registry: &KindRegistry,
        kind: &str,
        info: BTreeMap<String, String>,
        expire_time_ms: i64,
    ) -> Result<Self, ValidationError> {
        let kind = registry.resolve(kind)?;
        Self::new(kind, info, expire_time_ms)
    }

    /// Wire name of the credential's kind
    pub fn credential_type(&self) -> &str {
        self.inner.kind.name()
    }

    /// The kind descriptor
    pub fn kind(&self) -> &Arc<dyn CredentialKind> {
        &self.inner.kind
    }

    /// Expiry in epoch milliseconds; `0` means the credential does not expire
    pub fn expire_time_ms(&self) -> i64 {
        self.inner.expire_time_ms
    }

    /// The payload
    pub fn credential_info(&self) -> &BTreeMap<String, String> {
        &self.inner.info
    }

    /// A single payload value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.info.get(key).map(String::as_str)
    }

    /// Whether the credential carries an expiry
    pub fn expires(&self) -> bool {
        self.inner.expire_time_ms != 0
    }

    /// Whether the credential is past its expiry at `now_ms`
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires() && now_ms >= self.inner.expire_time_ms
    }

    /// Wire form of this credential
    pub fn to_dto(&self) -> CredentialDto {
        CredentialDto::from(self)
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.credential_type() == other.credential_type()
                && self.inner.expire_time_ms == other.inner.expire_time_ms
                && self.inner.info == other.inner.info)
    }
}

impl Eq for Credential {}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("type", &self.credential_type())
            .field("expire_time_ms", &self.inner.expire_time_ms)
            .field("info", &RedactedInfo(&self.inner.info))
            .finish()
    }
}

pub(crate) struct RedactedInfo<'a>(pub(crate) &'a BTreeMap<String, String>);

impl fmt::Debug for RedactedInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.keys().map(|key| (key, REDACTED)))
            .finish()
    }
}
