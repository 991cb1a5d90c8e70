//! Dissects a capture of raw `linkarq` frames, one hex-encoded frame per
//! line, and prints each frame's decoded header, payload preview, and
//! CRC verdict. Feeds every line through [`linkarq::Frame::deserialize`],
//! the same parser the runtime uses, so a capture is dissected exactly
//! as the session driver would have seen it.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use linkarq::frame::{Frame, FrameKind};

#[derive(Parser)]
#[command(name = "linkarq-dissect", about = "Dissect captured linkarq frames")]
struct Cli {
    /// Path to a capture file: one hex-encoded frame per line.
    /// Blank lines and lines starting with `#` are ignored.
    capture: PathBuf,

    /// Bytes of payload to show before truncating the preview.
    #[arg(long, default_value_t = 32)]
    preview_bytes: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let contents = fs::read_to_string(&cli.capture)
        .with_context(|| format!("reading capture file {}", cli.capture.display()))?;

    let mut total = 0usize;
    let mut invalid = 0usize;

    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        total += 1;
        let bytes = match hex::decode(line.replace(' ', "")) {
            Ok(bytes) => bytes,
            Err(err) => {
                invalid += 1;
                println!("{}", format!("line {}: invalid hex ({err})", lineno + 1).red());
                continue;
            }
        };

        match Frame::deserialize(&bytes) {
            Ok((frame, crc_valid)) => print_frame(lineno + 1, &frame, crc_valid, cli.preview_bytes),
            Err(err) => {
                invalid += 1;
                println!("{}", format!("line {}: {err}", lineno + 1).red());
            }
        }
    }

    println!();
    println!("{total} frame(s), {invalid} unparseable");

    Ok(())
}

fn print_frame(lineno: usize, frame: &Frame, crc_valid: bool, preview_bytes: usize) {
    let kind = match frame.kind {
        FrameKind::Data => "DATA".blue(),
        FrameKind::Ack => "ACK".cyan(),
    };
    let verdict = if crc_valid { "crc ok".green() } else { "crc FAIL".red() };

    let preview_len = frame.payload.len().min(preview_bytes);
    let preview = hex::encode(&frame.payload[..preview_len]);
    let truncated = if frame.payload.len() > preview_bytes { "..." } else { "" };

    println!(
        "line {lineno}: seq={:<3} {kind} len={:<4} {verdict}  {preview}{truncated}",
        frame.seq,
        frame.payload.len(),
    );
}
