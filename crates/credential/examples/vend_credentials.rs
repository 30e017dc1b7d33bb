//! Load a catalog with static S3 keys and vend a credential for a table.
//!
//! Run with `cargo run -p keystone-credential --example vend_credentials`.

use keystone_credential::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = keystone_log::auto_init()?;

    let manager = CredentialManager::new(ProviderRegistry::builtin());
    let properties = CatalogProperties::new()
        .with("credential-providers", "s3-secret-key")
        .with("s3-access-key-id", "AKIAEXAMPLE")
        .with("s3-secret-access-key", "example-secret")
        .with("s3-endpoint", "http://localhost:9000");
    manager.load_catalog("lake", &properties)?;

    let scope = CredentialScope::read_only(["s3://warehouse/sales/orders"]);
    let credential = manager.get_credential("lake", "s3-secret-key", &scope).await?;

    // Debug output redacts every value
    println!("vended: {credential:?}");
    println!("kinds: {:?}", manager.credential_types("lake")?);
    println!("stats: {:?}", manager.cache_stats());
    Ok(())
}
