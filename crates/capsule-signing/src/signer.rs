//! Detached signing of a package's content digest.

use chrono::{SubsecRound, Utc};
use log::{debug, info};
use pgp::composed::{ArmorOptions, SignedSecretKey, StandaloneSignature};
use pgp::crypto::hash::HashAlgorithm;
use pgp::packet::{SignatureConfig, SignatureType, Subpacket, SubpacketData};
use pgp::types::{KeyDetails as _, Password};
use rand::thread_rng;

use crate::armor::generator_headers;
use crate::error::SigningError;
use crate::identity::SigningIdentity;
use crate::keys::KeyStore;
use crate::section::{SectionStore, PUBKEY_SECTION, SIGNATURE_SECTION};

/// Signs a package's content digest and embeds the proof.
///
/// Two armored blocks are written into the package: the signer's public
/// key into `.sig_key` and a detached signature over the digest's hex
/// text into `.sha256_sig`. The digest must already exclude both of
/// those sections, otherwise embedding would invalidate it.
pub fn sign_package(
    store: &KeyStore,
    package: &mut impl SectionStore,
    digest: &str,
) -> Result<(), SigningError> {
    let secret_key = store.load_secret_key()?;
    let public_key = store.load_public_key()?;
    let identity = SigningIdentity::build(public_key, secret_key, Utc::now())?;

    debug!("signing content digest {digest}");
    let signature_armored = sign_digest_text(identity.secret(), digest)?;
    let pubkey_armored = identity.public_key().to_armored_string(ArmorOptions {
        headers: Some(&generator_headers()),
        include_checksum: true,
    })?;

    package.embed(PUBKEY_SECTION, &pubkey_armored)?;
    package.embed(SIGNATURE_SECTION, &signature_armored)?;

    info!(
        "signed package with key {}",
        hex::encode(identity.secret().primary_key.key_id())
    );
    Ok(())
}

/// A detached, armored signature over the digest's hex text.
///
/// The signature covers the textual digest, not the raw hash bytes, so
/// a verifier can recompute and compare without caring how the digest
/// was encoded on the signing side.
fn sign_digest_text(key: &SignedSecretKey, digest: &str) -> Result<String, SigningError> {
    let mut config =
        SignatureConfig::from_key(thread_rng(), &key.primary_key, SignatureType::Binary)?;
    config.hash_alg = HashAlgorithm::Sha256;
    config.hashed_subpackets = vec![
        Subpacket::regular(SubpacketData::IssuerFingerprint(
            key.primary_key.fingerprint(),
        ))?,
        Subpacket::critical(SubpacketData::SignatureCreationTime(
            Utc::now().trunc_subsecs(0),
        ))?,
    ];
    config.unhashed_subpackets = vec![Subpacket::regular(SubpacketData::Issuer(
        key.primary_key.key_id(),
    ))?];

    let signature = config.sign(&key.primary_key, &Password::from(""), digest.as_bytes())?;
    let armored =
        StandaloneSignature::new(signature).to_armored_string(ArmorOptions::default())?;
    Ok(armored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::MemorySections;

    fn signed_package(digest: &str) -> MemorySections {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::in_dir(dir.path());
        store.generate_with_bits(2048).unwrap();

        let mut package = MemorySections::new();
        package.reserve(PUBKEY_SECTION, 16384);
        package.reserve(SIGNATURE_SECTION, 16384);
        sign_package(&store, &mut package, digest).unwrap();
        package
    }

    fn section_text(package: &MemorySections, name: &str) -> String {
        let bytes = package.section(name).unwrap().unwrap();
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        String::from_utf8(bytes[..end].to_vec()).unwrap()
    }

    #[test]
    fn signing_embeds_both_armored_blocks() {
        let package = signed_package("0f4e");

        let pubkey = section_text(&package, PUBKEY_SECTION);
        assert!(pubkey.starts_with("-----BEGIN PGP PUBLIC KEY BLOCK-----"));

        let sig = section_text(&package, SIGNATURE_SECTION);
        assert!(sig.starts_with("-----BEGIN PGP SIGNATURE-----"));
    }

    #[test]
    fn embedded_key_parses_as_a_keyring() {
        use pgp::composed::{Deserializable, SignedPublicKey};

        let package = signed_package("0f4e");
        let pubkey = section_text(&package, PUBKEY_SECTION);

        let (keys, _) = SignedPublicKey::from_string_many(&pubkey).unwrap();
        let keys: Vec<_> = keys.collect::<Result<_, _>>().unwrap();
        assert_eq!(keys.len(), 1);
        keys[0].verify().unwrap();
    }

    #[test]
    fn signing_without_key_artifacts_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::in_dir(dir.path());
        let mut package = MemorySections::new();
        package.reserve(PUBKEY_SECTION, 16384);
        package.reserve(SIGNATURE_SECTION, 16384);

        let err = sign_package(&store, &mut package, "0f4e").unwrap_err();
        assert!(matches!(err, SigningError::KeyLoad { .. }));
    }

    #[test]
    fn signing_fails_when_sections_are_too_small() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::in_dir(dir.path());
        store.generate_with_bits(2048).unwrap();
        let mut package = MemorySections::new();
        package.reserve(PUBKEY_SECTION, 64);
        package.reserve(SIGNATURE_SECTION, 64);

        let err = sign_package(&store, &mut package, "0f4e").unwrap_err();
        assert!(matches!(err, SigningError::Embed { .. }));
    }
}
