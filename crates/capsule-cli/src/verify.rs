//! `capsule verify` — verify a package's embedded signature.

use std::path::Path;

use capsule_signing::elf::ElfPackage;
use capsule_signing::{digest, verifier};

pub fn run(package_path: &Path) -> anyhow::Result<()> {
    let package = ElfPackage::open(package_path)?;
    let content = digest::content_digest(&package)?;

    println!(
        "Verifying {} ({} bytes)...",
        package_path.display(),
        package.bytes().len()
    );

    let signer = verifier::verify_package(&package, &content)?;

    println!("✓ Signature valid");
    println!("  Key ID:      {}", signer.key_id);
    println!("  Fingerprint: {}", signer.fingerprint);
    if !signer.user_id.is_empty() {
        println!("  Signer:      {}", signer.user_id);
    }

    Ok(())
}
