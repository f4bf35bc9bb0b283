//! Sealwire CLI binary.
//!
//! # Commands
//!
//! - `demo` - Negotiate two in-memory connections and push a message through
//! - `inspect` - Decode a frame header without decrypting
//! - `config` - Print the effective configuration

use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use sealwire::{
    codec::{Frame, FrameMode, PayloadTag},
    config::Config,
    runtime, SecureConnection, VERSION,
};
use serde_json::json;

#[derive(Parser)]
#[command(name = "sealwire")]
#[command(version = VERSION)]
#[command(about = "Sealwire - per-connection secure transport", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file (default: <config_dir>/sealwire/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Negotiate two in-memory connections and round-trip a message
    Demo {
        /// Message text (or - for stdin)
        #[arg(short, long)]
        input: Option<String>,

        /// Read the message from a file
        #[arg(short, long, conflicts_with = "input")]
        file: Option<PathBuf>,

        /// Negotiate without encryption
        #[arg(long)]
        plain: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a base64 frame header
    Inspect {
        /// Base64-encoded frame
        frame: String,

        /// Parse as a sealed frame
        #[arg(long)]
        sealed: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?.with_env_overrides(),
        None => Config::load()?,
    };

    match cli.command {
        Commands::Demo {
            input,
            file,
            plain,
            json,
        } => {
            runtime::init(&config)?;
            let result = cmd_demo(input, file, plain, json);
            runtime::teardown();
            result
        },
        Commands::Inspect { frame, sealed } => cmd_inspect(&frame, sealed),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        },
    }
}

fn cmd_demo(
    input: Option<String>,
    file: Option<PathBuf>,
    plain: bool,
    as_json: bool,
) -> anyhow::Result<()> {
    let message = read_input(input, file)?;

    let mut alice = SecureConnection::detached(1, !plain);
    let mut bob = SecureConnection::detached(2, true);

    let offer = alice.create_offer()?;
    let response = bob
        .accept_offer(&offer)?
        .context("responder rejected the offer")?;
    anyhow::ensure!(
        alice.finalize_offer(&response)?,
        "initiator rejected the response"
    );

    let frame = alice.encrypt(&message)?;
    let decoded = bob.try_decrypt(&frame)?;
    anyhow::ensure!(decoded == message, "round trip mismatch");

    let mode = alice
        .frame_mode()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "pass-through".to_string());

    if as_json {
        let report = json!({
            "encrypted": alice.is_encryption_requested(),
            "mode": mode,
            "offer_len": offer.len(),
            "response_len": response.len(),
            "input_len": message.len(),
            "frame_len": frame.len(),
            "frame": STANDARD.encode(&frame),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Negotiated:  {}", mode);
        println!("Input:       {} bytes", message.len());
        println!("Frame:       {} bytes", frame.len());
        println!("Overhead:    {} bytes", frame.len() as i64 - message.len() as i64);
        println!("Round trip:  ok");
        println!("{}", STANDARD.encode(&frame));
    }

    Ok(())
}

fn cmd_inspect(encoded: &str, sealed: bool) -> anyhow::Result<()> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .context("frame is not valid base64")?;
    let mode = if sealed {
        FrameMode::Sealed
    } else {
        FrameMode::Plain
    };

    let frame = Frame::decode(&bytes, mode)?;
    let layout = frame.mode().to_string();
    let report = match frame {
        Frame::Plain { payload } => json!({
            "mode": layout,
            "frame_len": bytes.len(),
            "payload_len": payload.len(),
            "payload_tag": describe_tag(payload.first().copied()),
        }),
        Frame::Sealed {
            iv,
            payload_len,
            body,
        } => json!({
            "mode": layout,
            "frame_len": bytes.len(),
            "iv": STANDARD.encode(iv),
            "payload_len": payload_len,
            "body_len": body.len(),
        }),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn describe_tag(tag: Option<u8>) -> String {
    match tag.map(|t| (t, PayloadTag::from_byte(t))) {
        Some((_, Some(tag))) => format!("{:?}", tag),
        Some((byte, None)) => format!("unknown ({byte})"),
        None => "empty".to_string(),
    }
}

fn read_input(input: Option<String>, file: Option<PathBuf>) -> anyhow::Result<Vec<u8>> {
    if let Some(path) = file {
        return std::fs::read(&path).with_context(|| format!("reading {}", path.display()));
    }

    match input.as_deref() {
        Some("-") | None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        },
        Some(text) => Ok(text.as_bytes().to_vec()),
    }
}
