use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arc_licensing::Verifier;
use clap::{Parser, Subcommand};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "arc-license-gate")]
#[command(about = "arc license gate server and license inspection tool")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the license gate server (default when no command is given)
    Serve {
        /// Port to listen on, overriding ARC_PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Verify a license token file and print its contents
    Inspect {
        /// File holding the signed license token
        #[arg(default_value = "license.lic")]
        license_file: PathBuf,

        /// PEM-encoded RSA public key of the license issuer
        #[arg(long, env = "LICENSE_PUBLIC_KEY_PATH", default_value = "./public.pem")]
        public_key: PathBuf,
    },
}

pub fn run_inspect(license_file: &Path, public_key: &Path) -> Result<()> {
    let verifier = Verifier::from_file(public_key)?;
    let token = std::fs::read_to_string(license_file)
        .with_context(|| format!("read license file {}", license_file.display()))?;
    let license = verifier
        .verify(token.trim())
        .with_context(|| format!("verify license file {}", license_file.display()))?;

    let report = json!({
        "expired": license.is_expired(),
        "license": license,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["arc-license-gate"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_inspect_arguments() {
        let cli = Cli::try_parse_from([
            "arc-license-gate",
            "inspect",
            "/etc/arc/license.lic",
            "--public-key",
            "/etc/arc/public.pem",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Inspect {
                license_file,
                public_key,
            }) => {
                assert_eq!(license_file, PathBuf::from("/etc/arc/license.lic"));
                assert_eq!(public_key, PathBuf::from("/etc/arc/public.pem"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
