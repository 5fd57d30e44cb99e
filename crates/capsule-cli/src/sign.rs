//! `capsule sign` — sign a package in place.

use std::path::Path;

use capsule_signing::elf::ElfPackage;
use capsule_signing::keys::KeyStore;
use capsule_signing::{digest, signer};

pub fn run(package_path: &Path, key_dir: &Path) -> anyhow::Result<()> {
    let store = KeyStore::in_dir(key_dir);
    let mut package = ElfPackage::open(package_path)?;
    let content = digest::content_digest(&package)?;

    println!(
        "Signing {} ({} bytes)...",
        package_path.display(),
        package.bytes().len()
    );

    signer::sign_package(&store, &mut package, &content)?;

    println!("✓ Package signed");
    println!("  Digest: {content}");

    Ok(())
}
