//! Example: recovering the 4 unknown low bits of an AES-128 key.
//! Runs the same search on the exact local backend and on the in-process
//! queued service, then prints the verified key.
//!
//! `cargo run --example aes_key_search [config.toml]`
//! Set `RUST_LOG=grover_aes=debug` for per-round output.

use grover_aes::cipher::parse_block_hex;
use grover_aes::{BackendKind, KeySearch, PlaintextCiphertextPair, RunConfig, SearchReport};
use tracing_subscriber::EnvFilter;

fn default_config() -> grover_aes::Result<RunConfig> {
    let base = parse_block_hex("base_key", "00112233445566778899aabbccddeeff")?;
    let pair = PlaintextCiphertextPair::from_text("This is a test", "3c86e7ec17bb967b9da2f2242d94a634")?;
    let mut config = RunConfig::new(4, base, vec![pair]);
    config.shots = 1000;
    config.top_k = 3;
    config.seed = Some(7);
    Ok(config)
}

fn print_report(report: &SearchReport) {
    println!("Backend:    {}", report.backend);
    println!("Iterations: {}", report.iterations);
    println!("Expected success probability: {:.4}", report.expected_success_probability);
    for warning in &report.warnings {
        println!("Warning:    {}", warning);
    }
    println!("Outcome:\n{}", report.outcome);
    println!("Verdict:    {}", report.verdict);
    if let Some(key) = report.recovered_key() {
        println!("Recovered key: {}", hex::encode(key));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("grover_aes=info")))
        .with_target(false)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => RunConfig::from_file(path)?,
        None => default_config()?,
    };

    println!("--- Grover AES key search ({} unknown bits) ---", config.key_bit_length);
    for pair in &config.pairs {
        println!("Pair: {}", pair);
    }

    let local = KeySearch::new(config.clone())?.run().await?;
    print_report(&local);

    println!("\n--- Same search through the queued service ---");
    let mut remote_config = config;
    remote_config.backend_kind = BackendKind::Remote;
    remote_config.remote.poll_interval_ms = 10;
    let remote = KeySearch::new(remote_config)?.run().await?;
    print_report(&remote);

    Ok(())
}
