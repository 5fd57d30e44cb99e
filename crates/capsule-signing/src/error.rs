//! Error types for capsule signing operations.

use std::path::PathBuf;

use crate::armor::ArmoredKind;

/// Errors from keypair generation, signing and verification.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    /// The underlying RSA key generation failed.
    #[error("key generation failed: {0}")]
    Generation(String),

    /// A key artifact could not be created or written.
    #[error("could not write key artifact {path}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A key artifact is absent, unreadable, or not a key packet.
    #[error("could not load key artifact {path}: {reason}")]
    KeyLoad { path: PathBuf, reason: String },

    /// A key artifact decoded to the wrong kind of block.
    #[error("key artifact {path} holds a {found} block, expected a {expected} block")]
    KeyType {
        path: PathBuf,
        expected: ArmoredKind,
        found: ArmoredKind,
    },

    /// Armor framing or packet structure could not be parsed.
    #[error("invalid armor: {0}")]
    Decode(String),

    /// The embedded `.sig_key` block could not be read as a keyring.
    #[error("could not decode embedded keyring: {0}")]
    KeyringDecode(String),

    /// An expected package section is not present.
    #[error("package section {0} is missing")]
    SectionMissing(String),

    /// Writing into a package section failed.
    #[error("could not embed into section {section}: {reason}")]
    Embed { section: String, reason: String },

    /// The package is not a well-formed ELF image.
    #[error("malformed package: {0}")]
    MalformedPackage(String),

    /// No positive proof of a valid signature was found.
    #[error("could not verify package signature")]
    Unverified,

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// OpenPGP layer error.
    #[error("OpenPGP error: {0}")]
    Pgp(#[from] pgp::errors::Error),
}
