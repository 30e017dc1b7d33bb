//! Credential kinds and the kind registry

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::core::ValidationError;

/// How a kind treats `expire_time_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpiryPolicy {
    /// Never expires; expiry must be `0`
    Fixed,
    /// Short-lived; expiry must be a positive epoch-millisecond instant
    Expiring,
}

/// Describes one credential kind: its wire name, expiry policy and keys.
///
/// A kind is a descriptor, not a value. Values are [`Credential`]s that
/// point back at their kind.
///
/// [`Credential`]: crate::Credential
pub trait CredentialKind: Send + Sync + fmt::Debug {
    /// Stable wire name, e.g. `s3-secret-key`
    fn name(&self) -> &str;

    /// Expiry policy
    fn expiry(&self) -> ExpiryPolicy;

    /// Keys every payload must contain
    fn required_keys(&self) -> &[&'static str];

    /// Keys a payload may contain in addition to the required ones
    fn optional_keys(&self) -> &[&'static str] {
        &[]
    }

    /// Check a payload and expiry against this kind.
    ///
    /// The default implementation enforces the expiry policy, rejects blank
    /// keys and values and undeclared keys, and requires every required key.
    /// Kinds with extra rules should call it before their own checks.
    fn validate(
        &self,
        expire_time_ms: i64,
        info: &BTreeMap<String, String>,
    ) -> Result<(), ValidationError> {
        let kind = self.name();

        match self.expiry() {
            ExpiryPolicy::Fixed if expire_time_ms != 0 => {
                return Err(ValidationError::ExpiryMustBeZero {
                    kind: kind.to_string(),
                    expire_time_ms,
                });
            }
            ExpiryPolicy::Expiring if expire_time_ms <= 0 => {
                return Err(ValidationError::ExpiryMustBePositive {
                    kind: kind.to_string(),
                    expire_time_ms,
                });
            }
            _ => {}
        }

        for (key, value) in info {
            if key.trim().is_empty() {
                return Err(ValidationError::BlankKey {
                    kind: kind.to_string(),
                });
            }
            let declared = self
                .required_keys()
                .iter()
                .chain(self.optional_keys())
                .any(|declared| *declared == key.as_str());
            if !declared {
                return Err(ValidationError::UnexpectedKey {
                    kind: kind.to_string(),
                    key: key.clone(),
                });
            }
            if value.trim().is_empty() {
                return Err(ValidationError::BlankValue {
                    kind: kind.to_string(),
                    key: key.clone(),
                });
            }
        }

        if let Some(missing) = self
            .required_keys()
            .iter()
            .find(|key| !info.contains_key(**key))
        {
            return Err(ValidationError::MissingKey {
                kind: kind.to_string(),
                key: (*missing).to_string(),
            });
        }

        Ok(())
    }
}

/// Name → kind lookup used when credentials arrive in wire form.
///
/// Filled at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    kinds: HashMap<String, Arc<dyn CredentialKind>>,
}

impl KindRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in kind
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for kind in super::builtin::all() {
            registry.register(kind);
        }
        registry
    }

    /// Add a kind, returning the one it replaced under the same name.
    pub fn register(&mut self, kind: Arc<dyn CredentialKind>) -> Option<Arc<dyn CredentialKind>> {
        self.kinds.insert(kind.name().to_string(), kind)
    }

    /// Look up a kind by wire name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn CredentialKind>> {
        self.kinds.get(name)
    }

    /// Look up a kind, failing with [`ValidationError::UnknownKind`]
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn CredentialKind>, ValidationError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownKind {
                kind: name.to_string(),
            })
    }

    /// Registered kind names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.kinds.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[derive(Debug)]
    struct ApiKey;

    impl CredentialKind for ApiKey {
        fn name(&self) -> &str {
            "api-key"
        }

        fn expiry(&self) -> ExpiryPolicy {
            ExpiryPolicy::Fixed
        }

        fn required_keys(&self) -> &[&'static str] {
            &["api-key"]
        }

        fn optional_keys(&self) -> &[&'static str] {
            &["api-region"]
        }
    }

    fn info(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[rstest]
    #[case::required_only(&[("api-key", "k")])]
    #[case::with_optional(&[("api-key", "k"), ("api-region", "eu")])]
    fn accepts_declared_keys(#[case] pairs: &[(&str, &str)]) {
        assert_eq!(ApiKey.validate(0, &info(pairs)), Ok(()));
    }

    #[rstest]
    #[case::missing(&[("api-region", "eu")], "missing required key 'api-key'")]
    #[case::blank_value(&[("api-key", "  ")], "blank value for key 'api-key'")]
    #[case::blank_key(&[("api-key", "k"), (" ", "x")], "contains a blank key")]
    #[case::undeclared(&[("api-key", "k"), ("token", "t")], "does not accept key 'token'")]
    fn rejects_bad_payloads(#[case] pairs: &[(&str, &str)], #[case] expected: &str) {
        let err = ApiKey.validate(0, &info(pairs)).unwrap_err();
        assert!(err.to_string().contains(expected), "{err}");
    }

    #[test]
    fn fixed_kind_rejects_expiry() {
        let err = ApiKey.validate(1, &info(&[("api-key", "k")])).unwrap_err();
        assert!(matches!(err, ValidationError::ExpiryMustBeZero { .. }));
    }

    #[test]
    fn registry_resolves_and_replaces() {
        let mut registry = KindRegistry::new();
        assert!(registry.register(Arc::new(ApiKey)).is_none());
        assert!(registry.register(Arc::new(ApiKey)).is_some());
        assert_eq!(registry.resolve("api-key").unwrap().name(), "api-key");
        assert_eq!(
            registry.resolve("nope").unwrap_err(),
            ValidationError::UnknownKind {
                kind: "nope".into()
            }
        );
    }

    #[test]
    fn builtin_registry_lists_every_kind() {
        assert_eq!(
            KindRegistry::builtin().names(),
            vec![
                "adls-token",
                "azure-account-key",
                "gcs-token",
                "oss-secret-key",
                "oss-token",
                "s3-secret-key",
                "s3-token",
            ]
        );
    }
}
