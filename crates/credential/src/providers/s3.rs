//! S3 providers: static access keys and STS session tokens

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::CredentialProvider;
use super::config::{CatalogProperties, ProviderConfig};
use super::registry::ProviderRegistry;
use crate::core::{ConfigError, CredentialError, CredentialResult, CredentialScope};
use crate::credential::Credential;
use crate::credential::builtin::{
    S3_ACCESS_KEY_ID, S3_SECRET_ACCESS_KEY, S3SecretKey, S3Token,
};
use crate::utils::time::{duration_millis, now_millis};

/// Provider name of [`S3SecretKeyProvider`]
pub const S3_SECRET_KEY_PROVIDER: &str = "s3-secret-key";
/// Provider name of [`S3TokenProvider`]
pub const S3_TOKEN_PROVIDER: &str = "s3-token";

const S3_ENDPOINT: &str = "s3-endpoint";
const S3_ROLE_ARN: &str = "s3-role-arn";
const S3_REGION: &str = "s3-region";
const S3_EXTERNAL_ID: &str = "s3-external-id";
const S3_TOKEN_EXPIRE_IN_SECS: &str = "s3-token-expire-in-secs";
const DEFAULT_TOKEN_EXPIRE_IN_SECS: u64 = 3600;

// ---------------------------------------------------------------------------
// Static keys
// ---------------------------------------------------------------------------

/// Configuration of [`S3SecretKeyProvider`]
#[derive(Clone)]
pub struct S3SecretKeyConfig {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Custom endpoint, for S3-compatible stores
    pub endpoint: Option<String>,
}

impl fmt::Debug for S3SecretKeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3SecretKeyConfig")
            .field("access_key_id", &"<redacted>")
            .field("secret_access_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl ProviderConfig for S3SecretKeyConfig {
    fn from_properties(properties: &CatalogProperties) -> Result<Self, ConfigError> {
        Ok(Self {
            access_key_id: properties.required(S3_ACCESS_KEY_ID)?.to_string(),
            secret_access_key: properties.required(S3_SECRET_ACCESS_KEY)?.to_string(),
            endpoint: properties.optional(S3_ENDPOINT)?.map(str::to_string),
        })
    }

    fn provider_name(&self) -> &'static str {
        S3_SECRET_KEY_PROVIDER
    }
}

/// Hands out the catalog's static S3 key pair.
///
/// The credential is built once at load time; scope is ignored because
/// static keys cannot be narrowed.
#[derive(Debug)]
pub struct S3SecretKeyProvider {
    credential: Credential,
    endpoint: Option<String>,
}

impl S3SecretKeyProvider {
    /// Build the provider and its credential.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the keys do not form a valid
    /// `s3-secret-key` credential.
    pub fn new(config: S3SecretKeyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let credential = S3SecretKey::credential(
            config.access_key_id.as_str(),
            config.secret_access_key.as_str(),
        )
        .map_err(|e| ConfigError::InvalidValue {
            field: S3_SECRET_KEY_PROVIDER.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            credential,
            endpoint: config.endpoint,
        })
    }

    /// Configured endpoint, if any
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}

#[async_trait]
impl CredentialProvider for S3SecretKeyProvider {
    fn name(&self) -> &str {
        S3_SECRET_KEY_PROVIDER
    }

    fn credential_type(&self) -> &str {
        S3SecretKey::NAME
    }

    async fn get_credential(&self, _scope: &CredentialScope) -> CredentialResult<Credential> {
        Ok(self.credential.clone())
    }
}

// ---------------------------------------------------------------------------
// Session tokens
// ---------------------------------------------------------------------------

/// Input to [`SessionTokenIssuer::assume_role`]
#[derive(Debug, Clone, PartialEq)]
pub struct AssumeRoleRequest {
    /// Role to assume
    pub role_arn: String,
    /// External id required by the role's trust policy
    pub external_id: Option<String>,
    /// STS region
    pub region: Option<String>,
    /// Session name recorded by STS
    pub session_name: String,
    /// Requested lifetime
    pub duration: Duration,
    /// Inline session policy narrowing the role, if scoped
    pub policy: Option<Value>,
}

/// Temporary credentials returned by an issuer
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionToken {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Session token
    pub session_token: String,
    /// Expiry in epoch milliseconds
    pub expire_time_ms: i64,
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("expire_time_ms", &self.expire_time_ms)
            .finish_non_exhaustive()
    }
}

/// An issuer failed to mint a session token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct IssuerError {
    message: String,
}

impl IssuerError {
    /// Create an error; `message` must not contain secret material
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The STS client seam used by [`S3TokenProvider`]
#[async_trait]
pub trait SessionTokenIssuer: Send + Sync {
    /// Assume a role and return its temporary credentials
    async fn assume_role(&self, request: &AssumeRoleRequest) -> Result<SessionToken, IssuerError>;
}

/// Configuration of [`S3TokenProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3TokenConfig {
    /// Role to assume
    pub role_arn: String,
    /// STS region
    pub region: Option<String>,
    /// External id
    pub external_id: Option<String>,
    /// Requested token lifetime
    pub expire_in: Duration,
}

impl ProviderConfig for S3TokenConfig {
    fn from_properties(properties: &CatalogProperties) -> Result<Self, ConfigError> {
        let secs = properties.parse_or(S3_TOKEN_EXPIRE_IN_SECS, DEFAULT_TOKEN_EXPIRE_IN_SECS)?;
        let config = Self {
            role_arn: properties.required(S3_ROLE_ARN)?.to_string(),
            region: properties.optional(S3_REGION)?.map(str::to_string),
            external_id: properties.optional(S3_EXTERNAL_ID)?.map(str::to_string),
            expire_in: Duration::from_secs(secs),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.expire_in.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: S3_TOKEN_EXPIRE_IN_SECS.to_string(),
                reason: "must be a positive integer".to_string(),
            });
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        S3_TOKEN_PROVIDER
    }
}

/// Mints `s3-token` credentials by assuming a role.
///
/// Path-scoped requests carry a session policy limited to those paths.
pub struct S3TokenProvider {
    config: S3TokenConfig,
    issuer: Arc<dyn SessionTokenIssuer>,
}

impl S3TokenProvider {
    /// Create a provider.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` is invalid.
    pub fn new(config: S3TokenConfig, issuer: Arc<dyn SessionTokenIssuer>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, issuer })
    }

    /// The provider's configuration
    pub fn config(&self) -> &S3TokenConfig {
        &self.config
    }

    fn request(&self, scope: &CredentialScope) -> CredentialResult<AssumeRoleRequest> {
        let policy = match scope {
            CredentialScope::Catalog => None,
            CredentialScope::Paths { read, write } => Some(session_policy(read, write)?),
        };
        Ok(AssumeRoleRequest {
            role_arn: self.config.role_arn.clone(),
            external_id: self.config.external_id.clone(),
            region: self.config.region.clone(),
            session_name: format!("keystone-{}", now_millis()),
            duration: self.config.expire_in,
            policy,
        })
    }
}

impl fmt::Debug for S3TokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3TokenProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialProvider for S3TokenProvider {
    fn name(&self) -> &str {
        S3_TOKEN_PROVIDER
    }

    fn credential_type(&self) -> &str {
        S3Token::NAME
    }

    async fn get_credential(&self, scope: &CredentialScope) -> CredentialResult<Credential> {
        let request = self.request(scope)?;
        tracing::debug!(
            role_arn = %request.role_arn,
            scoped = request.policy.is_some(),
            duration_ms = duration_millis(request.duration),
            "Assuming role for S3 session token"
        );

        let token = self
            .issuer
            .assume_role(&request)
            .await
            .map_err(|e| CredentialError::generation(S3_TOKEN_PROVIDER, e.to_string()))?;

        S3Token::credential(
            token.access_key_id.as_str(),
            token.secret_access_key.as_str(),
            token.session_token.as_str(),
            token.expire_time_ms,
        )
        .map_err(|e| CredentialError::generation(S3_TOKEN_PROVIDER, e.to_string()))
    }
}

impl ProviderRegistry {
    /// Register the `s3-token` provider backed by `issuer`
    pub fn register_s3_token(&mut self, issuer: Arc<dyn SessionTokenIssuer>) -> &mut Self {
        self.register(S3_TOKEN_PROVIDER, move |props| {
            let config = S3TokenConfig::from_properties(props)?;
            Ok(Arc::new(S3TokenProvider::new(config, Arc::clone(&issuer))?)
                as Arc<dyn CredentialProvider>)
        })
    }
}

// ---------------------------------------------------------------------------
// Session policy
// ---------------------------------------------------------------------------

fn split_location(location: &str) -> Option<(&str, &str)> {
    let rest = location
        .strip_prefix("s3://")
        .or_else(|| location.strip_prefix("s3a://"))?;
    let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
    (!bucket.is_empty()).then_some((bucket, key.trim_start_matches('/')))
}

/// Least-privilege IAM session policy for the given `s3://` locations.
///
/// Read locations get object reads, write locations additionally get object
/// writes and deletes. Listing is limited to the locations' prefixes.
///
/// # Errors
///
/// Returns [`CredentialError::Generation`] if no location is given or one is
/// not an `s3://` or `s3a://` URI.
pub fn session_policy(
    read: &BTreeSet<String>,
    write: &BTreeSet<String>,
) -> CredentialResult<Value> {
    if read.is_empty() && write.is_empty() {
        return Err(CredentialError::generation(
            S3_TOKEN_PROVIDER,
            "path scope lists no locations",
        ));
    }

    let mut read_objects = BTreeSet::new();
    let mut write_objects = BTreeSet::new();
    let mut prefixes: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();

    for (location, writable) in read
        .iter()
        .map(|l| (l, false))
        .chain(write.iter().map(|l| (l, true)))
    {
        let (bucket, key) = split_location(location).ok_or_else(|| {
            CredentialError::generation(
                S3_TOKEN_PROVIDER,
                format!("unsupported location '{location}'"),
            )
        })?;
        let object = format!("arn:aws:s3:::{bucket}/{key}*");
        read_objects.insert(object.clone());
        if writable {
            write_objects.insert(object);
        }
        prefixes.entry(bucket).or_default().insert(format!("{key}*"));
    }

    let mut statements = vec![json!({
        "Effect": "Allow",
        "Action": ["s3:GetObject", "s3:GetObjectVersion"],
        "Resource": read_objects,
    })];
    if !write_objects.is_empty() {
        statements.push(json!({
            "Effect": "Allow",
            "Action": ["s3:PutObject", "s3:DeleteObject"],
            "Resource": write_objects,
        }));
    }
    for (bucket, bucket_prefixes) in &prefixes {
        statements.push(json!({
            "Effect": "Allow",
            "Action": ["s3:ListBucket"],
            "Resource": format!("arn:aws:s3:::{bucket}"),
            "Condition": { "StringLike": { "s3:prefix": bucket_prefixes } },
        }));
    }
    let buckets: Vec<String> = prefixes
        .keys()
        .map(|bucket| format!("arn:aws:s3:::{bucket}"))
        .collect();
    statements.push(json!({
        "Effect": "Allow",
        "Action": ["s3:GetBucketLocation"],
        "Resource": buckets,
    }));

    Ok(json!({ "Version": "2012-10-17", "Statement": statements }))
}
