//! Keystore bootstrap tool.
//!
//! Creates `<home>/etc/keystore` holding a self-signed certificate under
//! the server's fixed identity alias, and lists the aliases of an existing
//! store. The keystore password comes from the same environment variable
//! the server reads.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use anteroom::config::password_from_env;
use anteroom::tls::keystore::{self_signed_entry, Keystore, SERVER_IDENTITY_ALIAS};

#[derive(Parser)]
#[command(name = "anteroom-keytool")]
#[command(about = "Bootstrap and inspect the anteroom keystore", long_about = None)]
struct Cli {
    /// Server home directory; the keystore lives at <home>/etc/keystore.
    #[arg(long)]
    home: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a keystore with a self-signed certificate under the server
    /// identity alias.
    Init {
        /// Hostnames to place in the certificate.
        #[arg(long, default_value = "localhost")]
        hostname: Vec<String>,

        /// Overwrite an existing keystore.
        #[arg(long)]
        force: bool,
    },
    /// List the aliases in the keystore.
    Show,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let path = cli.home.join("etc").join("keystore");
    let password = password_from_env()?;

    match cli.command {
        Commands::Init { hostname, force } => {
            if path.exists() && !force {
                eprintln!(
                    "error: {} already exists (use --force to overwrite)",
                    path.display()
                );
                std::process::exit(1);
            }
            let entry = self_signed_entry(SERVER_IDENTITY_ALIAS, hostname)?;
            Keystore::create(&path, &password, vec![entry])?;
            println!(
                "created {} with self-signed identity `{}`",
                path.display(),
                SERVER_IDENTITY_ALIAS
            );
        }
        Commands::Show => {
            let store = Keystore::load(&path, &password)?;
            for alias in store.aliases() {
                println!("{alias}");
            }
        }
    }

    Ok(())
}
