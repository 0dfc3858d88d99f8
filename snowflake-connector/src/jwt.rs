use std::path::Path;

use base64::Engine;
use jwt_simple::prelude::*;

/// Sign a key-pair token for `ACCOUNT.USER`.
///
/// Both identifiers are expected upper-cased already.
pub fn create_token(
    public_key: &str,
    private_key: &str,
    account_identifier: &str,
    user: &str,
) -> Result<String, KeyPairError> {
    let public_key_fingerprint = fingerprint(public_key)?;
    let qualified_username = format!("{account_identifier}.{user}");
    let issuer = format!("{qualified_username}.SHA256:{public_key_fingerprint}");
    let claims = Claims::create(Duration::from_hours(1))
        .with_issuer(issuer)
        .with_subject(qualified_username);
    let key_pair = RS256KeyPair::from_pem(private_key).map_err(KeyPairError::KeyPairGeneration)?;
    key_pair
        .sign(claims)
        .map_err(KeyPairError::KeyPairGeneration)
}

/// Snowflake wants the thumbprint in padded standard base64,
/// `jwt_simple` hands it back url-safe and unpadded.
fn fingerprint(public_key: &str) -> Result<String, KeyPairError> {
    let thumbprint = RS256PublicKey::from_pem(public_key)
        .map_err(KeyPairError::FingerprintGeneration)?
        .sha256_thumbprint();
    let digest = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(thumbprint)
        .map_err(|e| KeyPairError::FingerprintGeneration(e.into()))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(digest))
}

pub fn read_private_key<P: AsRef<Path>>(path: P) -> Result<String, KeyFileReadError> {
    std::fs::read_to_string(&path).map_err(|error| KeyFileReadError::PrivateKeyRead {
        error,
        path: path.as_ref().display().to_string(),
    })
}

pub fn read_public_key<P: AsRef<Path>>(path: P) -> Result<String, KeyFileReadError> {
    std::fs::read_to_string(&path).map_err(|error| KeyFileReadError::PublicKeyRead {
        error,
        path: path.as_ref().display().to_string(),
    })
}

#[derive(thiserror::Error, Debug)]
pub enum KeyFileReadError {
    #[error("failed to read public key at {path}: {error}")]
    PublicKeyRead { error: std::io::Error, path: String },
    #[error("failed to read private key at {path}: {error}")]
    PrivateKeyRead { error: std::io::Error, path: String },
}

#[derive(thiserror::Error, Debug)]
pub enum KeyPairError {
    #[error("failed to generate fingerprint from public key: {0}")]
    FingerprintGeneration(anyhow::Error),
    #[error("failed to generate key pair from private key: {0}")]
    KeyPairGeneration(anyhow::Error),
}
