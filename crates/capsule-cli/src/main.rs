//! `capsule` — keypair management, signing and verification for
//! self-contained executable packages.

mod keygen;
mod sign;
mod verify;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Sign and verify capsule packages with OpenPGP keys.
#[derive(Parser)]
#[command(name = "capsule", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a new RSA-4096 signing keypair.
    Keygen {
        /// Directory receiving the `privkey` and `pubkey` artifacts.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Sign a package and embed the proof into its reserved sections.
    Sign {
        /// Path to the package to sign.
        package: PathBuf,
        /// Directory holding the key artifacts.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Verify a package's embedded signature.
    Verify {
        /// Path to the package to verify.
        package: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Keygen { dir } => keygen::run(&dir),
        Command::Sign { package, dir } => sign::run(&package, &dir),
        Command::Verify { package } => verify::run(&package),
    }
}
