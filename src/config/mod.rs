// src/config/mod.rs

//! Run configuration, loadable from TOML.
//!
//! ```toml
//! key_bit_length = 4
//! base_key = "00112233445566778899aabbccddeeff"
//! shots = 1000
//! top_k = 3
//! backend_kind = "local"
//!
//! [[pairs]]
//! plaintext = "54686973206973206120746573740000"
//! ciphertext = "3c86e7ec17bb967b9da2f2242d94a634"
//! ```

use crate::backend::{BackendKind, RemotePolicy};
use crate::cipher::{Block, KeySpace, PlaintextCiphertextPair, parse_block_hex};
use crate::core::{AES_KEY_BITS, GroverError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn default_marked_count() -> usize {
    1
}

fn default_shots() -> usize {
    1024
}

fn default_top_k() -> usize {
    3
}

fn default_qubit_budget() -> usize {
    24
}

fn default_memory_budget() -> u64 {
    1 << 30
}

/// Everything one key-search run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Unknown low bits of the key, `n`
    pub key_bit_length: usize,
    /// Known key template; its low `key_bit_length` bits are ignored
    #[serde(with = "hex::serde")]
    pub base_key: Block,
    pub pairs: Vec<PlaintextCiphertextPair>,
    /// `M` in the iteration-count formula
    #[serde(default = "default_marked_count")]
    pub assumed_marked_count: usize,
    #[serde(default = "default_shots")]
    pub shots: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub backend_kind: BackendKind,
    /// Seed for every random draw in the run
    #[serde(default)]
    pub seed: Option<u64>,
    /// Sample `shots` shots on the local backend instead of reading exact probabilities
    #[serde(default)]
    pub local_sampling: bool,
    /// Most key + ancilla qubits an oracle may use
    #[serde(default = "default_qubit_budget")]
    pub qubit_budget: usize,
    /// Largest amplitude vector the local backend may allocate
    #[serde(default = "default_memory_budget")]
    pub memory_budget_bytes: u64,
    #[serde(default)]
    pub remote: RemoteConfig,
}

impl RunConfig {
    /// A config with defaults for everything but the search inputs.
    pub fn new(key_bit_length: usize, base_key: Block, pairs: Vec<PlaintextCiphertextPair>) -> Self {
        Self {
            key_bit_length,
            base_key,
            pairs,
            assumed_marked_count: default_marked_count(),
            shots: default_shots(),
            top_k: default_top_k(),
            backend_kind: BackendKind::default(),
            seed: None,
            local_sampling: false,
            qubit_budget: default_qubit_budget(),
            memory_budget_bytes: default_memory_budget(),
            remote: RemoteConfig::default(),
        }
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    /// `Config` for text that is not valid TOML or does not fit the schema,
    /// `OracleConstruction` for a key or pair that is not one AES block, and
    /// whatever [`RunConfig::validate`] rejects.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let table: toml::Table = text.parse()?;
        check_block_fields(&table)?;
        let config: RunConfig = toml::Value::Table(table).try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Serializes back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| GroverError::Config { message: e.to_string() })
    }

    /// Rejects configurations no run could use.
    ///
    /// # Errors
    /// `OracleConstruction` for a zero marked count, zero `top_k` or `shots`, a key
    /// length outside `1..=128`, or no pairs.
    pub fn validate(&self) -> Result<()> {
        if self.assumed_marked_count == 0 {
            return Err(GroverError::oracle(
                "assumed_marked_count must be at least 1; the iteration count is undefined for 0",
            ));
        }
        if self.top_k == 0 {
            return Err(GroverError::oracle("top_k must be at least 1"));
        }
        if self.shots == 0 {
            return Err(GroverError::oracle("shots must be at least 1"));
        }
        if self.key_bit_length == 0 || self.key_bit_length > AES_KEY_BITS {
            return Err(GroverError::oracle(format!(
                "key_bit_length must be within 1..={}, got {}",
                AES_KEY_BITS, self.key_bit_length
            )));
        }
        if self.pairs.is_empty() {
            return Err(GroverError::oracle("at least one plaintext/ciphertext pair is required"));
        }
        Ok(())
    }

    pub fn key_space(&self) -> Result<KeySpace> {
        KeySpace::new(self.base_key, self.key_bit_length)
    }
}

/// Decodes every hex block in the raw table so a wrong length surfaces as
/// `OracleConstruction` rather than a schema error.
fn check_block_fields(table: &toml::Table) -> Result<()> {
    if let Some(toml::Value::String(text)) = table.get("base_key") {
        parse_block_hex("base_key", text)?;
    }
    if let Some(toml::Value::Array(pairs)) = table.get("pairs") {
        for (i, pair) in pairs.iter().enumerate() {
            for field in ["plaintext", "ciphertext"] {
                if let Some(toml::Value::String(text)) = pair.get(field) {
                    parse_block_hex(&format!("pairs[{}].{}", i, field), text)?;
                }
            }
        }
    }
    Ok(())
}

/// `[remote]` table: waits and retries in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Polls the in-process queued service keeps a job pending
    pub queue_polls: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            timeout_ms: 600_000,
            max_attempts: 5,
            initial_backoff_ms: 200,
            max_backoff_ms: 10_000,
            queue_polls: 2,
        }
    }
}

impl RemoteConfig {
    pub fn policy(&self) -> RemotePolicy {
        RemotePolicy {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_millis(self.timeout_ms),
            max_attempts: self.max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}
