//! Content digest of a package, independent of its signing sections.

use sha2::{Digest, Sha256};

use crate::elf::ElfPackage;
use crate::error::SigningError;
use crate::section::{PUBKEY_SECTION, SIGNATURE_SECTION};

/// Hex SHA-256 over the package image with both signing sections zeroed.
///
/// Zeroing `.sig_key` and `.sha256_sig` makes the digest stable across
/// signing: the value computed before embedding equals the value a
/// verifier recomputes afterwards. Packages without those sections
/// digest as-is.
pub fn content_digest(package: &ElfPackage) -> Result<String, SigningError> {
    let mut data = package.bytes().to_vec();
    for name in [PUBKEY_SECTION, SIGNATURE_SECTION] {
        if let Some(range) = package.section_range(name) {
            data[range].fill(0);
        }
    }
    Ok(hex::encode(Sha256::digest(&data)))
}
