//! Fail-closed verification of an embedded package signature.

use std::io::Cursor;

use log::{debug, warn};
use pgp::composed::{Deserializable, SignedPublicKey, StandaloneSignature};
use pgp::types::KeyDetails as _;

use crate::error::SigningError;
use crate::section::{SectionStore, PUBKEY_SECTION, SIGNATURE_SECTION};

/// What verification learned about a package's signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerInfo {
    pub key_id: String,
    pub fingerprint: String,
    pub user_id: String,
}

/// Checks the embedded signature against the recomputed content digest.
///
/// Every failure mode is an error: a missing section, undecodable
/// armor, an empty keyring, or a signature no embedded key accepts.
/// Success names the key that produced the valid signature.
pub fn verify_package(
    package: &impl SectionStore,
    digest: &str,
) -> Result<SignerInfo, SigningError> {
    let keyring = embedded_keyring(package)?;
    let signature = embedded_signature(package)?;

    debug!(
        "checking digest {digest} against {} embedded key(s)",
        keyring.len()
    );
    for key in &keyring {
        match signature.verify(&key.primary_key, digest.as_bytes()) {
            Ok(()) => return Ok(signer_info(key)),
            Err(e) => warn!(
                "key {} rejected the signature: {e}",
                hex::encode(key.key_id())
            ),
        }
    }
    Err(SigningError::Unverified)
}

fn embedded_keyring(package: &impl SectionStore) -> Result<Vec<SignedPublicKey>, SigningError> {
    let bytes = package
        .section(PUBKEY_SECTION)?
        .ok_or_else(|| SigningError::SectionMissing(PUBKEY_SECTION.to_string()))?;
    let text = section_text(&bytes)
        .ok_or_else(|| SigningError::KeyringDecode("section is not valid text".into()))?;

    let (keys, _) = SignedPublicKey::from_string_many(text)
        .map_err(|e| SigningError::KeyringDecode(e.to_string()))?;
    let keyring: Vec<SignedPublicKey> = keys
        .collect::<Result<_, _>>()
        .map_err(|e| SigningError::KeyringDecode(e.to_string()))?;
    if keyring.is_empty() {
        return Err(SigningError::KeyringDecode(
            "embedded block contains no keys".into(),
        ));
    }
    Ok(keyring)
}

fn embedded_signature(package: &impl SectionStore) -> Result<StandaloneSignature, SigningError> {
    let bytes = package
        .section(SIGNATURE_SECTION)?
        .ok_or_else(|| SigningError::SectionMissing(SIGNATURE_SECTION.to_string()))?;
    let text = section_text(&bytes)
        .ok_or_else(|| SigningError::Decode("signature section is not valid text".into()))?;

    let (signature, _) = StandaloneSignature::from_armor_single(Cursor::new(text))
        .map_err(|e| SigningError::Decode(format!("invalid detached signature: {e}")))?;
    Ok(signature)
}

/// Strips the zero padding a reserved section carries after its payload.
fn section_text(bytes: &[u8]) -> Option<&str> {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..end]).ok()
}

fn signer_info(key: &SignedPublicKey) -> SignerInfo {
    let user_id = key
        .details
        .users
        .first()
        .map(|user| String::from_utf8_lossy(user.id.id()).to_string())
        .unwrap_or_default();
    SignerInfo {
        key_id: hex::encode(key.key_id()),
        fingerprint: hex::encode(key.fingerprint().as_bytes()),
        user_id,
    }
}
