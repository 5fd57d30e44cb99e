//! `capsule keygen` — generate a signing keypair.

use std::path::Path;

use capsule_signing::keys::KeyStore;

pub fn run(dir: &Path) -> anyhow::Result<()> {
    let store = KeyStore::in_dir(dir);

    // Don't overwrite existing keys
    if store.privkey_path().exists() || store.pubkey_path().exists() {
        anyhow::bail!(
            "key artifacts already exist in {}. Remove them first or use --dir.",
            dir.display()
        );
    }

    let (wrote_priv, wrote_pub) = store.generate()?;

    println!("✓ Generated RSA-4096 keypair");
    println!(
        "  Private key: {} ({wrote_priv} bytes)",
        store.privkey_path().display()
    );
    println!(
        "  Public key:  {} ({wrote_pub} bytes)",
        store.pubkey_path().display()
    );
    println!();
    println!("  Keep the private key safe! Share only the public key.");

    Ok(())
}
