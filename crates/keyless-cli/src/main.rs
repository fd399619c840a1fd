//! Keyless signing CLI
//!
//! Signs an artifact with a short-lived certificate bound to an OIDC
//! identity and records the signature in a transparency log.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use keyless_oidc::TokenGetter;
use keyless_sign::{SigningConfig, SigningContext};
use keyless_types::CallContext;
use std::path::PathBuf;
use std::time::Duration;

mod output;
mod sniff;

#[derive(Parser)]
#[command(name = "keyless")]
#[command(about = "Keyless artifact signing with Fulcio and Rekor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign an artifact
    Sign(SignArgs),
}

#[derive(Args)]
struct SignArgs {
    /// Artifact to sign
    #[arg(short, long)]
    artifact: PathBuf,
    /// OIDC provider to be used to issue the identity token
    #[arg(long, env = "KEYLESS_OIDC_ISSUER")]
    oidc_issuer: Option<String>,
    /// Client ID for the application
    #[arg(long, env = "KEYLESS_OIDC_CLIENT_ID")]
    oidc_client_id: Option<String>,
    /// Client secret for the application
    #[arg(long, env = "KEYLESS_OIDC_CLIENT_SECRET", hide_env_values = true)]
    oidc_client_secret: Option<String>,
    /// Fulcio server URL
    #[arg(long, env = "KEYLESS_FULCIO_SERVER")]
    fulcio_server: Option<String>,
    /// Rekor server URL
    #[arg(long, env = "KEYLESS_REKOR_SERVER")]
    rekor_server: Option<String>,
    /// File to write the signing certificate to
    #[arg(short, long)]
    cert_out: Option<PathBuf>,
    /// File to write the raw signature to
    #[arg(short, long)]
    sig_out: Option<PathBuf>,
    /// Use this identity token instead of running an OIDC flow
    #[arg(long, env = "KEYLESS_IDENTITY_TOKEN", hide_env_values = true, conflicts_with_all = ["device", "ambient"])]
    identity_token: Option<String>,
    /// Use the device code flow instead of a browser
    #[arg(long, conflicts_with = "ambient")]
    device: bool,
    /// Use the identity token of the surrounding CI system
    #[arg(long)]
    ambient: bool,
    /// Use the Sigstore staging instance
    #[arg(long)]
    staging: bool,
    /// Deadline for each network call, in seconds
    #[arg(long, default_value_t = 120)]
    timeout: u64,
}

impl SignArgs {
    fn config(&self) -> SigningConfig {
        let mut config = if self.staging {
            SigningConfig::staging()
        } else {
            SigningConfig::production()
        };
        if let Some(issuer) = &self.oidc_issuer {
            config.oidc_issuer = issuer.clone();
        }
        if let Some(client_id) = &self.oidc_client_id {
            config.oidc_client_id = client_id.clone();
        }
        if let Some(secret) = self.oidc_client_secret.as_ref().filter(|s| !s.is_empty()) {
            config.oidc_client_secret = Some(secret.clone());
        }
        if let Some(url) = &self.fulcio_server {
            config.fulcio_url = url.clone();
        }
        if let Some(url) = &self.rekor_server {
            config.rekor_url = url.clone();
        }
        config.timeout = Some(Duration::from_secs(self.timeout));
        config
    }

    fn token_getter(&self) -> TokenGetter {
        match (&self.identity_token, self.device, self.ambient) {
            (Some(token), _, _) => TokenGetter::Static(token.clone()),
            (None, true, _) => TokenGetter::DeviceCode,
            (None, false, true) => TokenGetter::Ambient,
            (None, false, false) => TokenGetter::InteractiveBrowser,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Sign(args) => sign(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[tokio::main]
async fn sign(args: SignArgs) -> anyhow::Result<()> {
    let payload = std::fs::read(&args.artifact)
        .with_context(|| format!("reading {}", args.artifact.display()))?;

    let config = args.config();
    let media_type = sniff::detect_media_type(&payload);
    if !config.policy.allows(media_type) {
        bail!("file type currently not supported: {}", media_type);
    }
    tracing::debug!(media_type, "artifact accepted");

    let context = SigningContext::with_config(config);
    let signer = context.signer(args.token_getter());
    let output = signer
        .sign(&mut payload.as_slice(), &CallContext::background())
        .await?;

    println!("Signed as {} (issuer {})", output.subject, output.issuer);
    println!(
        "Received signing certificate with serial number: {}",
        output.serial()
    );
    println!("Rekor entry successful. URL: {}", output.log_url);

    if let Some(path) = &args.cert_out {
        output::write_private(path, output.certificate_pem().as_bytes())
            .with_context(|| format!("writing certificate to {}", path.display()))?;
    }
    if let Some(path) = &args.sig_out {
        output::write_private(path, output.signature.as_bytes())
            .with_context(|| format!("writing signature to {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> SignArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Sign(args) => args,
        }
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["keyless", "sign", "--artifact", "a.txt"]);
        assert_eq!(args.token_getter(), TokenGetter::InteractiveBrowser);
        let config = args.config();
        assert_eq!(config.oidc_issuer, "https://oauth2.sigstore.dev/auth");
        assert_eq!(config.oidc_client_id, "sigstore");
        assert_eq!(config.timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "keyless",
            "sign",
            "-a",
            "a.txt",
            "--staging",
            "--rekor-server",
            "https://rekor.internal",
            "--oidc-client-secret",
            "",
            "--device",
        ]);
        assert_eq!(args.token_getter(), TokenGetter::DeviceCode);
        let config = args.config();
        assert_eq!(config.fulcio_url, "https://fulcio.sigstage.dev");
        assert_eq!(config.rekor_url, "https://rekor.internal");
        assert_eq!(config.oidc_client_secret, None);
    }

    #[test]
    fn test_static_token_conflicts_with_device() {
        assert!(Cli::try_parse_from([
            "keyless",
            "sign",
            "-a",
            "a.txt",
            "--identity-token",
            "t",
            "--device",
        ])
        .is_err());
    }
}
