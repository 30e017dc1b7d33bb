//! Credential value scenarios: construction rules, wire form, custom kinds.

use std::collections::BTreeMap;
use std::sync::Arc;

use keystone_credential::{
    AdlsToken, AzureAccountKey, Credential, CredentialDto, CredentialKind, ExpiryPolicy,
    GcsToken, KindRegistry, OssSecretKey, OssToken, S3SecretKey, S3Token, ValidationError,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

fn info(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn s3_static_scenario() {
    let credential = S3SecretKey::credential("AKIA...", "secret123").unwrap();

    assert_eq!(credential.credential_type(), "s3-secret-key");
    assert_eq!(credential.expire_time_ms(), 0);
    assert_eq!(
        credential.credential_info(),
        &info(&[
            ("s3-access-key-id", "AKIA..."),
            ("s3-secret-access-key", "secret123"),
        ])
    );
}

#[test]
fn blank_secret_is_rejected() {
    assert!(matches!(
        S3SecretKey::credential("AKIA...", "   "),
        Err(ValidationError::BlankValue { key, .. }) if key == "s3-secret-access-key"
    ));
}

#[rstest]
#[case::s3_secret_key(S3SecretKey::NAME, ExpiryPolicy::Fixed)]
#[case::s3_token(S3Token::NAME, ExpiryPolicy::Expiring)]
#[case::oss_secret_key(OssSecretKey::NAME, ExpiryPolicy::Fixed)]
#[case::oss_token(OssToken::NAME, ExpiryPolicy::Expiring)]
#[case::azure_account_key(AzureAccountKey::NAME, ExpiryPolicy::Fixed)]
#[case::adls_token(AdlsToken::NAME, ExpiryPolicy::Expiring)]
#[case::gcs_token(GcsToken::NAME, ExpiryPolicy::Expiring)]
fn expiry_policy_is_enforced(#[case] kind: &str, #[case] policy: ExpiryPolicy) {
    let registry = KindRegistry::builtin();
    let descriptor = registry.get(kind).unwrap();
    assert_eq!(descriptor.expiry(), policy);

    let payload: BTreeMap<String, String> = descriptor
        .required_keys()
        .iter()
        .map(|key| ((*key).to_string(), "value".to_string()))
        .collect();

    let (valid, invalid) = match policy {
        ExpiryPolicy::Fixed => (0, 1_700_000_000_000),
        ExpiryPolicy::Expiring => (1_700_000_000_000, 0),
    };
    assert!(Credential::initialize(&registry, kind, payload.clone(), valid).is_ok());
    assert!(Credential::initialize(&registry, kind, payload.clone(), invalid).is_err());
    if policy == ExpiryPolicy::Expiring {
        assert!(Credential::initialize(&registry, kind, payload, -1).is_err());
    }
}

#[test]
fn json_round_trip_is_observationally_equal() {
    let original = OssToken::credential("id", "secret", "sts-token", 1_700_000_000_000).unwrap();

    let text = serde_json::to_string(&original.to_dto()).unwrap();
    let dto: CredentialDto = serde_json::from_str(&text).unwrap();
    let restored = Credential::try_from(dto).unwrap();

    assert_eq!(restored, original);
    assert_eq!(restored.credential_type(), original.credential_type());
    assert_eq!(restored.expire_time_ms(), original.expire_time_ms());
    assert_eq!(restored.credential_info(), original.credential_info());
}

#[derive(Debug)]
struct HdfsDelegationToken;

impl CredentialKind for HdfsDelegationToken {
    fn name(&self) -> &str {
        "hdfs-delegation-token"
    }

    fn expiry(&self) -> ExpiryPolicy {
        ExpiryPolicy::Expiring
    }

    fn required_keys(&self) -> &[&'static str] {
        &["hdfs-token"]
    }

    fn optional_keys(&self) -> &[&'static str] {
        &["hdfs-renewer"]
    }
}

#[test]
fn custom_kind_through_registry() {
    let mut registry = KindRegistry::builtin();
    registry.register(Arc::new(HdfsDelegationToken));

    let dto: CredentialDto = serde_json::from_value(json!({
        "type": "hdfs-delegation-token",
        "expireTimeMs": 1_700_000_000_000_i64,
        "info": { "hdfs-token": "abc" }
    }))
    .unwrap();

    // not a built-in kind
    assert_eq!(
        Credential::try_from(dto.clone()).unwrap_err(),
        ValidationError::UnknownKind {
            kind: "hdfs-delegation-token".into()
        }
    );

    let credential = dto.into_credential(&registry).unwrap();
    assert_eq!(credential.get("hdfs-token"), Some("abc"));
    assert_eq!(credential.get("hdfs-renewer"), None);
}

#[test]
fn undeclared_key_is_rejected() {
    let err = Credential::initialize(
        &KindRegistry::builtin(),
        "gcs-token",
        info(&[("gcs-token", "t"), ("s3-session-token", "x")]),
        1,
    )
    .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"Credential 'gcs-token' does not accept key 's3-session-token'");
}
