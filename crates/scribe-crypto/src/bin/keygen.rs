//! scribe-keygen: generate a session signing secret.

use clap::Parser;
use scribe_crypto::SigningKey;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "scribe-keygen")]
#[command(author, version, about = "Generate a SESSION_SECRET for scribe")]
struct Cli {
    /// Secret length in bytes (minimum 32)
    #[arg(short, long, default_value_t = 48)]
    bytes: usize,

    /// Print as an environment assignment (SESSION_SECRET=...)
    #[arg(short, long)]
    env: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.bytes < scribe_crypto::MIN_KEY_LENGTH {
        eprintln!(
            "Error: secret must be at least {} bytes",
            scribe_crypto::MIN_KEY_LENGTH
        );
        return ExitCode::FAILURE;
    }

    let key = SigningKey::generate(cli.bytes);
    if cli.env {
        println!("SESSION_SECRET={}", key.to_base64());
    } else {
        println!("{}", key.to_base64());
    }
    ExitCode::SUCCESS
}
