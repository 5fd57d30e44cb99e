//! OpenPGP signing and verification for capsule packages.
//!
//! A capsule package is a self-contained ELF executable that reserves
//! two named sections for provenance material: `.sig_key` for the
//! signer's armored public key and `.sha256_sig` for a detached
//! signature over the package's content digest. The digest is the
//! SHA-256 of the whole image with both of those sections zeroed, so
//! it is identical before and after signing.
//!
//! ```no_run
//! use std::path::Path;
//! use capsule_signing::{digest, elf::ElfPackage, keys::KeyStore, signer, verifier};
//!
//! # fn main() -> Result<(), capsule_signing::SigningError> {
//! let store = KeyStore::in_dir(Path::new("."));
//! store.generate()?;
//!
//! let mut package = ElfPackage::open(Path::new("./app"))?;
//! let digest = digest::content_digest(&package)?;
//! signer::sign_package(&store, &mut package, &digest)?;
//!
//! let package = ElfPackage::open(Path::new("./app"))?;
//! let digest = digest::content_digest(&package)?;
//! let signer = verifier::verify_package(&package, &digest)?;
//! println!("signed by {}", signer.fingerprint);
//! # Ok(())
//! # }
//! ```

pub mod armor;
pub mod digest;
pub mod elf;
pub mod error;
pub mod identity;
pub mod keys;
pub mod section;
pub mod signer;
pub mod verifier;

pub use error::SigningError;
pub use section::SectionStore;
pub use signer::sign_package;
pub use verifier::{verify_package, SignerInfo};
