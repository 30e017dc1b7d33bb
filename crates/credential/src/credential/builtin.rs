//! Built-in credential kinds
//!
//! Each kind gets a marker type with a typed constructor and a borrowed view
//! with typed accessors:
//!
//! ```
//! use keystone_credential::S3SecretKey;
//!
//! let credential = S3SecretKey::credential("AKIAEXAMPLE", "secret123").unwrap();
//! let view = S3SecretKey::view(&credential).unwrap();
//! assert_eq!(view.access_key_id(), "AKIAEXAMPLE");
//! assert_eq!(credential.expire_time_ms(), 0);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use super::Credential;
use super::kind::{CredentialKind, ExpiryPolicy};
use crate::core::ValidationError;

/// S3 access key id
pub const S3_ACCESS_KEY_ID: &str = "s3-access-key-id";
/// S3 secret access key
pub const S3_SECRET_ACCESS_KEY: &str = "s3-secret-access-key";
/// S3 session token
pub const S3_SESSION_TOKEN: &str = "s3-session-token";

/// OSS access key id
pub const OSS_ACCESS_KEY_ID: &str = "oss-access-key-id";
/// OSS secret access key
pub const OSS_SECRET_ACCESS_KEY: &str = "oss-secret-access-key";
/// OSS security token
pub const OSS_SECURITY_TOKEN: &str = "oss-security-token";

/// Azure storage account name
pub const AZURE_STORAGE_ACCOUNT_NAME: &str = "azure-storage-account-name";
/// Azure storage account key
pub const AZURE_STORAGE_ACCOUNT_KEY: &str = "azure-storage-account-key";
/// ADLS shared access signature
pub const ADLS_SAS_TOKEN: &str = "adls-sas-token";

/// GCS OAuth access token
pub const GCS_TOKEN: &str = "gcs-token";

macro_rules! builtin_kind {
    (@ctor Fixed, $kind:ident, $($field:ident: $key:ident),+) => {
        impl $kind {
            /// Build a validated credential of this kind. It never expires.
            pub fn credential(
                $($field: impl Into<String>),+
            ) -> Result<Credential, ValidationError> {
                let info: BTreeMap<String, String> =
                    [$(($key.to_string(), $field.into())),+].into_iter().collect();
                Credential::new(Arc::new($kind), info, 0)
            }
        }
    };
    (@ctor Expiring, $kind:ident, $($field:ident: $key:ident),+) => {
        impl $kind {
            /// Build a validated credential of this kind expiring at
            /// `expire_time_ms` (epoch milliseconds).
            pub fn credential(
                $($field: impl Into<String>,)+
                expire_time_ms: i64,
            ) -> Result<Credential, ValidationError> {
                let info: BTreeMap<String, String> =
                    [$(($key.to_string(), $field.into())),+].into_iter().collect();
                Credential::new(Arc::new($kind), info, expire_time_ms)
            }
        }
    };
    (
        $(#[$meta:meta])*
        $kind:ident / $view:ident = $name:literal, $expiry:ident {
            $($field:ident: $key:ident),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $kind;

        impl $kind {
            /// Wire name of this kind
            pub const NAME: &'static str = $name;

            /// Borrow `credential` as this kind, if it is one.
            pub fn view(credential: &Credential) -> Option<$view<'_>> {
                (credential.credential_type() == $name).then_some($view { credential })
            }
        }

        impl CredentialKind for $kind {
            fn name(&self) -> &str {
                $name
            }

            fn expiry(&self) -> ExpiryPolicy {
                ExpiryPolicy::$expiry
            }

            fn required_keys(&self) -> &[&'static str] {
                &[$($key),+]
            }
        }

        builtin_kind!(@ctor $expiry, $kind, $($field: $key),+);

        #[doc = concat!("Typed accessors over a `", $name, "` credential")]
        #[derive(Debug, Clone, Copy)]
        pub struct $view<'a> {
            credential: &'a Credential,
        }

        impl<'a> $view<'a> {
            $(
                #[doc = concat!("Value of `", stringify!($key), "`")]
                pub fn $field(&self) -> &'a str {
                    self.credential.get($key).unwrap_or_default()
                }
            )+

            /// The viewed credential
            pub fn credential(&self) -> &'a Credential {
                self.credential
            }
        }
    };
}

builtin_kind! {
    /// Static S3 access key pair
    S3SecretKey / S3SecretKeyView = "s3-secret-key", Fixed {
        access_key_id: S3_ACCESS_KEY_ID,
        secret_access_key: S3_SECRET_ACCESS_KEY,
    }
}

builtin_kind! {
    /// Temporary S3 session credentials
    S3Token / S3TokenView = "s3-token", Expiring {
        access_key_id: S3_ACCESS_KEY_ID,
        secret_access_key: S3_SECRET_ACCESS_KEY,
        session_token: S3_SESSION_TOKEN,
    }
}

builtin_kind! {
    /// Static Aliyun OSS access key pair
    OssSecretKey / OssSecretKeyView = "oss-secret-key", Fixed {
        access_key_id: OSS_ACCESS_KEY_ID,
        secret_access_key: OSS_SECRET_ACCESS_KEY,
    }
}

builtin_kind! {
    /// Temporary Aliyun OSS credentials
    OssToken / OssTokenView = "oss-token", Expiring {
        access_key_id: OSS_ACCESS_KEY_ID,
        secret_access_key: OSS_SECRET_ACCESS_KEY,
        security_token: OSS_SECURITY_TOKEN,
    }
}

builtin_kind! {
    /// Azure storage account shared key
    AzureAccountKey / AzureAccountKeyView = "azure-account-key", Fixed {
        account_name: AZURE_STORAGE_ACCOUNT_NAME,
        account_key: AZURE_STORAGE_ACCOUNT_KEY,
    }
}

builtin_kind! {
    /// ADLS shared access signature
    AdlsToken / AdlsTokenView = "adls-token", Expiring {
        account_name: AZURE_STORAGE_ACCOUNT_NAME,
        sas_token: ADLS_SAS_TOKEN,
    }
}

builtin_kind! {
    /// GCS OAuth access token
    GcsToken / GcsTokenView = "gcs-token", Expiring {
        token: GCS_TOKEN,
    }
}

pub(super) fn all() -> [Arc<dyn CredentialKind>; 7] {
    [
        Arc::new(S3SecretKey),
        Arc::new(S3Token),
        Arc::new(OssSecretKey),
        Arc::new(OssToken),
        Arc::new(AzureAccountKey),
        Arc::new(AdlsToken),
        Arc::new(GcsToken),
    ]
}
