//! Self-signed signer identity assembled from the bare key artifacts.
//!
//! The key artifacts hold only naked key packets. Before each signing
//! run the packets are promoted into a transferable key: an anonymous
//! user id carrying a positive certification, plus one encryption
//! subkey bound to the primary key. Verifiers can then treat the
//! embedded public block as an ordinary keyring.

use chrono::{DateTime, Duration, Utc};
use pgp::composed::{SignedKeyDetails, SignedPublicKey, SignedSecretKey, SignedSecretSubKey};
use pgp::crypto::hash::HashAlgorithm;
use pgp::packet::{
    self, KeyFlags, PacketTrait, PubKeyInner, Signature, SignatureConfig, SignatureType,
    Subpacket, SubpacketData, UserId,
};
use pgp::types::{KeyDetails as _, Password, PublicKeyTrait as _, SignedUser};
use rand::thread_rng;
use smallvec::smallvec;

use crate::error::SigningError;

/// Advertised lifetime of the bound subkey, one year in seconds.
pub const SUBKEY_LIFETIME_SECS: i64 = 31_536_000;

/// A fully certified signing identity.
pub struct SigningIdentity {
    secret: SignedSecretKey,
}

impl SigningIdentity {
    /// Certifies the keypair into a transferable key.
    ///
    /// The user id is intentionally empty; the identity of a package
    /// signer is its key, not a name. The subkey reuses the primary
    /// key material and is bound with storage and transport encryption
    /// flags plus a SHA-256 hash preference.
    pub fn build(
        public_key: packet::PublicKey,
        secret_key: packet::SecretKey,
        now: DateTime<Utc>,
    ) -> Result<Self, SigningError> {
        let user_id = UserId::from_str(Default::default(), "")?;
        let password = Password::from("");

        let cert_sig = certify_user(&secret_key, &public_key, &user_id, &password, now)?;

        let public_subkey = packet::PublicSubkey::from_inner(PubKeyInner::new(
            public_key.version(),
            public_key.algorithm(),
            *public_key.created_at(),
            public_key.expiration(),
            public_key.public_params().clone(),
        )?)?;
        let binding_sig =
            bind_subkey(&secret_key, &public_key, &public_subkey, &password, now)?;
        let subkey =
            packet::SecretSubkey::new(public_subkey, secret_key.secret_params().clone())?;

        let details = SignedKeyDetails::new(
            Vec::new(),
            Vec::new(),
            vec![SignedUser::new(user_id, vec![cert_sig])],
            Vec::new(),
        );
        let secret = SignedSecretKey::new(
            secret_key,
            details,
            Vec::new(),
            vec![SignedSecretSubKey::new(subkey, vec![binding_sig])],
        );

        Ok(Self { secret })
    }

    /// The public half, suitable for embedding next to a signature.
    pub fn public_key(&self) -> SignedPublicKey {
        SignedPublicKey::from(self.secret.clone())
    }

    pub(crate) fn secret(&self) -> &SignedSecretKey {
        &self.secret
    }
}

fn certify_user(
    secret_key: &packet::SecretKey,
    public_key: &packet::PublicKey,
    user_id: &UserId,
    password: &Password,
    now: DateTime<Utc>,
) -> Result<Signature, SigningError> {
    let mut config =
        SignatureConfig::from_key(thread_rng(), secret_key, SignatureType::CertPositive)?;
    config.hash_alg = HashAlgorithm::Sha256;

    let mut flags = KeyFlags::default();
    flags.set_sign(true);
    flags.set_certify(true);

    config.hashed_subpackets = vec![
        Subpacket::regular(SubpacketData::SignatureCreationTime(now))?,
        Subpacket::regular(SubpacketData::IssuerFingerprint(secret_key.fingerprint()))?,
        Subpacket::regular(SubpacketData::KeyFlags(flags))?,
        Subpacket::regular(SubpacketData::IsPrimary(false))?,
    ];
    config.unhashed_subpackets =
        vec![Subpacket::regular(SubpacketData::Issuer(secret_key.key_id()))?];

    let sig = config.sign_certification(secret_key, public_key, password, user_id.tag(), user_id)?;
    Ok(sig)
}

fn bind_subkey(
    secret_key: &packet::SecretKey,
    public_key: &packet::PublicKey,
    subkey: &packet::PublicSubkey,
    password: &Password,
    now: DateTime<Utc>,
) -> Result<Signature, SigningError> {
    let mut config =
        SignatureConfig::from_key(thread_rng(), secret_key, SignatureType::SubkeyBinding)?;
    config.hash_alg = HashAlgorithm::Sha256;

    let mut flags = KeyFlags::default();
    flags.set_encrypt_storage(true);
    flags.set_encrypt_comms(true);

    config.hashed_subpackets = vec![
        Subpacket::regular(SubpacketData::SignatureCreationTime(now))?,
        Subpacket::regular(SubpacketData::IssuerFingerprint(secret_key.fingerprint()))?,
        Subpacket::regular(SubpacketData::KeyFlags(flags))?,
        Subpacket::regular(SubpacketData::PreferredHashAlgorithms(smallvec![
            HashAlgorithm::Sha256
        ]))?,
        Subpacket::regular(SubpacketData::KeyExpirationTime(Duration::seconds(
            SUBKEY_LIFETIME_SECS,
        )))?,
    ];
    config.unhashed_subpackets =
        vec![Subpacket::regular(SubpacketData::Issuer(secret_key.key_id()))?];

    let sig = config.sign_subkey_binding(secret_key, public_key, password, subkey)?;
    Ok(sig)
}

#[cfg(test)]
mod tests {
    use pgp::types::KeyDetails as _;

    use super::*;
    use crate::keys::KeyStore;

    fn test_identity() -> SigningIdentity {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::in_dir(dir.path());
        store.generate_with_bits(2048).unwrap();
        let secret = store.load_secret_key().unwrap();
        let public = store.load_public_key().unwrap();
        SigningIdentity::build(public, secret, Utc::now()).unwrap()
    }

    #[test]
    fn identity_verifies_as_a_transferable_key() {
        let identity = test_identity();
        identity.secret().verify().unwrap();
        identity.public_key().verify().unwrap();
    }

    #[test]
    fn identity_has_a_single_anonymous_user() {
        let identity = test_identity();
        let users = &identity.secret().details.users;
        assert_eq!(users.len(), 1);
        assert!(users[0].id.id().is_empty());
        assert_eq!(users[0].signatures.len(), 1);
    }

    #[test]
    fn subkey_is_bound_to_the_primary() {
        let identity = test_identity();
        let subkeys = &identity.secret().secret_subkeys;
        assert_eq!(subkeys.len(), 1);

        let binding = &subkeys[0].signatures[0];
        assert_eq!(
            binding.issuer_fingerprint().into_iter().next(),
            Some(&identity.secret().primary_key.fingerprint())
        );
    }

    #[test]
    fn subkey_advertises_a_one_year_lifetime() {
        let identity = test_identity();
        let binding = &identity.secret().secret_subkeys[0].signatures[0];
        assert_eq!(
            binding.key_expiration_time(),
            Some(&Duration::seconds(SUBKEY_LIFETIME_SECS))
        );
    }
}
