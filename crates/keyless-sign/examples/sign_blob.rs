//! Sign a file and print where the signature was logged
//!
//! Usage:
//! ```sh
//! cargo run -p keyless-sign --example sign_blob -- [--staging] [--token TOKEN] FILE
//! ```
//!
//! Without `--token` the example uses the ambient CI token when running
//! under GitHub Actions or GitLab CI, and the device code flow otherwise.

use keyless_oidc::{detect_environment, TokenGetter};
use keyless_sign::SigningContext;
use keyless_types::CallContext;

use std::env;
use std::fs;
use std::process;

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    let mut token: Option<String> = None;
    let mut staging = false;
    let mut positional: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--token" | "-t" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --token requires a value");
                    process::exit(1);
                }
                token = Some(args[i].clone());
            }
            "--staging" => staging = true,
            arg if !arg.starts_with('-') => positional.push(arg.to_string()),
            unknown => {
                eprintln!("Error: Unknown option: {}", unknown);
                process::exit(1);
            }
        }
        i += 1;
    }

    let [path] = positional.as_slice() else {
        eprintln!("Usage: {} [--staging] [--token TOKEN] FILE", args[0]);
        process::exit(1);
    };

    let payload = match fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error reading '{}': {}", path, e);
            process::exit(1);
        }
    };

    let getter = match (token, detect_environment()) {
        (Some(token), _) => TokenGetter::Static(token),
        (None, Some(ci)) => {
            println!("Using ambient credentials from {:?}", ci);
            TokenGetter::Ambient
        }
        (None, None) => TokenGetter::DeviceCode,
    };

    let context = if staging {
        SigningContext::staging()
    } else {
        SigningContext::production()
    };

    match context
        .signer(getter)
        .sign(&mut payload.as_slice(), &CallContext::background())
        .await
    {
        Ok(output) => {
            println!("Signed {} as {}", path, output.subject);
            println!("  Certificate serial: {}", output.serial());
            println!("  Digest: {}:{}", output.artifact_digest.function, output.artifact_digest.to_hex());
            println!("  Log entry: {}", output.log_url);
        }
        Err(e) => {
            eprintln!("Signing failed at {} ({:?}): {}", e.stage, e.kind(), e.source);
            process::exit(1);
        }
    }
}
