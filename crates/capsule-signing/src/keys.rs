//! Keypair generation and the on-disk key artifacts.
//!
//! A key store owns exactly one signing keypair, persisted as two
//! armored artifacts under well-known names: `privkey` (the bare secret
//! key packet) and `pubkey` (its public half). The paths are injected so
//! independent stores can coexist, for example in tests.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use pgp::composed::{KeyType, SecretKeyParamsBuilder};
use pgp::packet::{self, Packet, PacketParser, PacketTrait as _};
use pgp::types::Password;
use rand::thread_rng;

use crate::armor::{self, ArmoredKind};
use crate::error::SigningError;

/// RSA modulus size of generated signing keys.
pub const KEY_BITS: u32 = 4096;

/// Well-known file name of the private key artifact.
pub const PRIVKEY_FILE: &str = "privkey";
/// Well-known file name of the public key artifact.
pub const PUBKEY_FILE: &str = "pubkey";

/// Locations of the two key artifacts.
#[derive(Debug, Clone)]
pub struct KeyStore {
    privkey_path: PathBuf,
    pubkey_path: PathBuf,
}

impl KeyStore {
    /// A key store rooted in `dir`, using the well-known artifact names.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            privkey_path: dir.join(PRIVKEY_FILE),
            pubkey_path: dir.join(PUBKEY_FILE),
        }
    }

    pub fn privkey_path(&self) -> &Path {
        &self.privkey_path
    }

    pub fn pubkey_path(&self) -> &Path {
        &self.pubkey_path
    }

    /// Generates a fresh RSA-4096 keypair and persists both halves.
    ///
    /// Returns the number of bytes written to the private and public
    /// artifact, in that order. Existing artifacts are overwritten. A
    /// failure writing the public artifact leaves the already written
    /// private artifact in place; callers that care must clean up.
    pub fn generate(&self) -> Result<(usize, usize), SigningError> {
        self.generate_with_bits(KEY_BITS)
    }

    pub(crate) fn generate_with_bits(&self, bits: u32) -> Result<(usize, usize), SigningError> {
        info!("generating RSA-{bits} signing keypair");

        let mut params = SecretKeyParamsBuilder::default();
        params
            .key_type(KeyType::Rsa(bits))
            .can_certify(true)
            .can_sign(true)
            .primary_user_id(String::new());
        let params = params
            .build()
            .map_err(|e| SigningError::Generation(e.to_string()))?;
        let secret_key = params
            .generate(thread_rng())
            .map_err(|e| SigningError::Generation(e.to_string()))?;
        let signed = secret_key
            .sign(&mut thread_rng(), &Password::from(""))
            .map_err(|e| SigningError::Generation(e.to_string()))?;

        // The artifacts hold bare key packets, not full transferable
        // keys; the signer rebuilds a certified identity on every use.
        let mut priv_bytes = Vec::new();
        signed.primary_key.to_writer_with_header(&mut priv_bytes)?;
        let mut pub_bytes = Vec::new();
        signed
            .primary_key
            .public_key()
            .to_writer_with_header(&mut pub_bytes)?;

        let privkey_armored = armor::encode(ArmoredKind::PrivateKey, &priv_bytes)?;
        let pubkey_armored = armor::encode(ArmoredKind::PublicKey, &pub_bytes)?;

        let wrote_priv = write_artifact(&self.privkey_path, privkey_armored.as_bytes())?;
        let wrote_pub = write_artifact(&self.pubkey_path, pubkey_armored.as_bytes())?;

        info!(
            "wrote {wrote_priv} bytes to {} and {wrote_pub} bytes to {}",
            self.privkey_path.display(),
            self.pubkey_path.display()
        );
        Ok((wrote_priv, wrote_pub))
    }

    /// Loads and decodes the private-key artifact.
    pub fn load_secret_key(&self) -> Result<packet::SecretKey, SigningError> {
        let payload = load_artifact(&self.privkey_path, ArmoredKind::PrivateKey)?;
        match parse_key_packet(&self.privkey_path, &payload)? {
            Packet::SecretKey(key) => Ok(key),
            other => Err(key_load(
                &self.privkey_path,
                format!("artifact holds a {:?} packet, not a secret key", other.tag()),
            )),
        }
    }

    /// Loads and decodes the public-key artifact.
    pub fn load_public_key(&self) -> Result<packet::PublicKey, SigningError> {
        let payload = load_artifact(&self.pubkey_path, ArmoredKind::PublicKey)?;
        match parse_key_packet(&self.pubkey_path, &payload)? {
            Packet::PublicKey(key) => Ok(key),
            other => Err(key_load(
                &self.pubkey_path,
                format!("artifact holds a {:?} packet, not a public key", other.tag()),
            )),
        }
    }
}

fn write_artifact(path: &Path, bytes: &[u8]) -> Result<usize, SigningError> {
    fs::write(path, bytes).map_err(|source| SigningError::Persist {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(bytes.len())
}

fn load_artifact(path: &Path, expected: ArmoredKind) -> Result<Vec<u8>, SigningError> {
    let text = fs::read_to_string(path).map_err(|e| key_load(path, e.to_string()))?;
    let (kind, payload) = match armor::decode(&text) {
        Ok(decoded) => decoded,
        Err(e) => return Err(key_load(path, e.to_string())),
    };
    if kind != expected {
        return Err(SigningError::KeyType {
            path: path.to_path_buf(),
            expected,
            found: kind,
        });
    }
    Ok(payload)
}

fn parse_key_packet(path: &Path, payload: &[u8]) -> Result<Packet, SigningError> {
    let mut parser = PacketParser::new(payload);
    match parser.next() {
        Some(Ok(packet)) => Ok(packet),
        Some(Err(e)) => Err(key_load(path, format!("invalid key packet: {e}"))),
        None => Err(key_load(path, "artifact contains no packet".into())),
    }
}

fn key_load(path: &Path, reason: String) -> SigningError {
    SigningError::KeyLoad {
        path: path.to_path_buf(),
        reason,
    }
}
