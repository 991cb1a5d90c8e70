//! Runs one Go-Back-N session over a message file and prints the report.
//!
//! ```text
//! linkarq-session <path> [--window N] [--timeout-ms N] [--max-attempts N]
//!                        [--p-loss F] [--p-error F] [--max-delay-ms N] [--json]
//! ```
//!
//! Every flag has an env var override (`LINKARQ_WINDOW`, `LINKARQ_TIMEOUT_MS`,
//! `LINKARQ_MAX_ATTEMPTS`, `LINKARQ_P_LOSS`, `LINKARQ_P_ERROR`,
//! `LINKARQ_MAX_DELAY_MS`), checked before argv parsing so a deployment can
//! pin tunables without touching the invocation.

use std::env;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use linkarq::channel::SimChannel;
use linkarq::session::{Session, SessionConfig};
use linkarq::tracing::prelude::*;

struct Args {
    path: String,
    window_size: usize,
    timeout_ms: u64,
    max_attempts: u32,
    p_loss: f64,
    p_error: f64,
    max_delay_ms: u64,
    json: bool,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn parse_args() -> Result<Args> {
    let defaults = SessionConfig::default();
    let mut path = None;
    let mut window_size = env_or("LINKARQ_WINDOW", defaults.window_size);
    let mut timeout_ms = env_or("LINKARQ_TIMEOUT_MS", defaults.timeout.as_millis() as u64);
    let mut max_attempts = env_or("LINKARQ_MAX_ATTEMPTS", defaults.max_attempts);
    let mut p_loss = env_or("LINKARQ_P_LOSS", 0.0f64);
    let mut p_error = env_or("LINKARQ_P_ERROR", 0.0f64);
    let mut max_delay_ms = env_or("LINKARQ_MAX_DELAY_MS", 0u64);
    let mut json = false;

    let mut argv = env::args().skip(1);
    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--window" => window_size = next_value(&mut argv, "--window")?,
            "--timeout-ms" => timeout_ms = next_value(&mut argv, "--timeout-ms")?,
            "--max-attempts" => max_attempts = next_value(&mut argv, "--max-attempts")?,
            "--p-loss" => p_loss = next_value(&mut argv, "--p-loss")?,
            "--p-error" => p_error = next_value(&mut argv, "--p-error")?,
            "--max-delay-ms" => max_delay_ms = next_value(&mut argv, "--max-delay-ms")?,
            "--json" => json = true,
            other if path.is_none() => path = Some(other.to_string()),
            other => anyhow::bail!("unrecognized argument: {other}"),
        }
    }

    Ok(Args {
        path: path.context("usage: linkarq-session <path> [flags]")?,
        window_size,
        timeout_ms,
        max_attempts,
        p_loss,
        p_error,
        max_delay_ms,
        json,
    })
}

fn next_value<T: std::str::FromStr>(argv: &mut impl Iterator<Item = String>, flag: &str) -> Result<T> {
    argv.next()
        .context(format!("{flag} requires a value"))?
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid value for {flag}"))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run().await {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<bool> {
    let args = parse_args()?;
    let message = std::fs::read(&args.path).context("reading message file")?;

    let channel = SimChannel::new(args.p_error, args.p_loss, Duration::from_millis(args.max_delay_ms));
    let config = SessionConfig {
        window_size: args.window_size,
        timeout: Duration::from_millis(args.timeout_ms),
        max_attempts: args.max_attempts,
    };

    info!(bytes = message.len(), "starting session");
    let mut session = Session::new(Box::new(channel), &message, config);
    let report = session.run().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "sent={} retransmitted={} acks={} accepted={} rejected={} duration={:?} success={} retransmission_rate={:.3}",
            report.sent,
            report.retransmitted,
            report.acks,
            report.accepted,
            report.rejected,
            report.duration,
            report.success,
            report.retransmission_rate,
        );
    }

    if report.success {
        let delivered = session.reassembled();
        anyhow::ensure!(delivered == message, "reassembled message does not match input");
    }

    Ok(report.success)
}
