use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::{Credential, KindRegistry, RedactedInfo};
use crate::core::ValidationError;

static BUILTIN_KINDS: LazyLock<KindRegistry> = LazyLock::new(KindRegistry::builtin);

/// Wire form of a [`Credential`]:
/// `{"type": "...", "expireTimeMs": 0, "info": {"...": "..."}}`.
///
/// Deserializing a DTO does not validate it; converting it into a
/// [`Credential`] does.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDto {
    /// Kind wire name
    #[serde(rename = "type")]
    pub credential_type: String,
    /// Expiry in epoch milliseconds, `0` for non-expiring kinds
    pub expire_time_ms: i64,
    /// Payload
    #[serde(default)]
    pub info: BTreeMap<String, String>,
}

impl CredentialDto {
    /// Validate against `registry`, which may hold custom kinds.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for unknown kinds or invalid payloads.
    pub fn into_credential(mut self, registry: &KindRegistry) -> Result<Credential, ValidationError> {
        let info = std::mem::take(&mut self.info);
        Credential::initialize(registry, &self.credential_type, info, self.expire_time_ms)
    }
}

impl Drop for CredentialDto {
    fn drop(&mut self) {
        for value in self.info.values_mut() {
            value.zeroize();
        }
    }
}

impl fmt::Debug for CredentialDto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialDto")
            .field("credential_type", &self.credential_type)
            .field("expire_time_ms", &self.expire_time_ms)
            .field("info", &RedactedInfo(&self.info))
            .finish()
    }
}

impl From<&Credential> for CredentialDto {
    fn from(credential: &Credential) -> Self {
        Self {
            credential_type: credential.credential_type().to_string(),
            expire_time_ms: credential.expire_time_ms(),
            info: credential.credential_info().clone(),
        }
    }
}

impl TryFrom<CredentialDto> for Credential {
    type Error = ValidationError;

    /// Converts through the built-in kinds only.
    fn try_from(dto: CredentialDto) -> Result<Self, Self::Error> {
        dto.into_credential(&BUILTIN_KINDS)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::credential::builtin::{AzureAccountKey, S3SecretKey};

    #[test]
    fn wire_shape() {
        let credential = S3SecretKey::credential("AKIAEXAMPLE", "secret123").unwrap();
        let value = serde_json::to_value(credential.to_dto()).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "s3-secret-key",
                "expireTimeMs": 0,
                "info": {
                    "s3-access-key-id": "AKIAEXAMPLE",
                    "s3-secret-access-key": "secret123"
                }
            })
        );
    }

    #[test]
    fn parses_and_validates() {
        let dto: CredentialDto = serde_json::from_value(json!({
            "type": "azure-account-key",
            "expireTimeMs": 0,
            "info": {
                "azure-storage-account-name": "acct",
                "azure-storage-account-key": "key=="
            }
        }))
        .unwrap();

        let credential = Credential::try_from(dto).unwrap();
        let view = AzureAccountKey::view(&credential).unwrap();
        assert_eq!(view.account_name(), "acct");
    }

    #[test]
    fn invalid_dto_is_rejected_on_conversion() {
        let dto: CredentialDto = serde_json::from_value(json!({
            "type": "s3-secret-key",
            "expireTimeMs": 42,
            "info": {
                "s3-access-key-id": "id",
                "s3-secret-access-key": "secret"
            }
        }))
        .unwrap();

        assert!(matches!(
            Credential::try_from(dto),
            Err(ValidationError::ExpiryMustBeZero {
                expire_time_ms: 42,
                ..
            })
        ));
    }

    #[test]
    fn debug_redacts_values() {
        let dto = S3SecretKey::credential("AKIAEXAMPLE", "hunter2")
            .unwrap()
            .to_dto();
        assert!(!format!("{dto:?}").contains("hunter2"));
    }
}
