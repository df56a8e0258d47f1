// src/cipher/mod.rs

//! The classical AES collaborator and the reduced key space searched over.
//!
//! The search engine never looks inside the block cipher: it only needs a
//! pure `encrypt(plaintext, key)` function, used once while synthesizing
//! the oracle and again when verifying measured candidates.

use crate::core::{AES_BLOCK_BYTES, AES_KEY_BITS, GroverError, Result};
use aes::Aes128;
use aes::cipher::{BlockEncrypt, KeyInit, generic_array::GenericArray};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One AES block (and one AES-128 key).
pub type Block = [u8; AES_BLOCK_BYTES];

/// A pure, deterministic block encryption function.
pub trait AesPrimitive: Send + Sync {
    /// Encrypts one block under `key`.
    fn encrypt(&self, plaintext: &Block, key: &Block) -> Block;
}

/// AES-128 in single-block (ECB) mode, backed by the RustCrypto `aes` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes128Primitive;

impl AesPrimitive for Aes128Primitive {
    fn encrypt(&self, plaintext: &Block, key: &Block) -> Block {
        let cipher = Aes128::new(GenericArray::from_slice(key));
        let mut block = GenericArray::clone_from_slice(plaintext);
        cipher.encrypt_block(&mut block);
        let mut out = [0u8; AES_BLOCK_BYTES];
        out.copy_from_slice(&block);
        out
    }
}

/// A known plaintext together with the ciphertext it encrypts to under the
/// secret key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaintextCiphertextPair {
    #[serde(with = "hex::serde")]
    pub plaintext: Block,
    #[serde(with = "hex::serde")]
    pub ciphertext: Block,
}

impl PlaintextCiphertextPair {
    pub fn new(plaintext: Block, ciphertext: Block) -> Self {
        Self { plaintext, ciphertext }
    }

    /// Builds a pair from arbitrary byte slices.
    ///
    /// # Errors
    /// `OracleConstruction` if either slice is not exactly one AES block.
    pub fn from_slices(plaintext: &[u8], ciphertext: &[u8]) -> Result<Self> {
        Ok(Self {
            plaintext: to_block("plaintext", plaintext)?,
            ciphertext: to_block("ciphertext", ciphertext)?,
        })
    }

    /// Builds a pair from a UTF-8 plaintext, padded with NUL bytes to a full
    /// block, and a hex-encoded ciphertext.
    ///
    /// # Errors
    /// `OracleConstruction` if the text is longer than one block or the hex
    /// does not decode to exactly one block.
    pub fn from_text(plaintext: &str, ciphertext_hex: &str) -> Result<Self> {
        let bytes = plaintext.as_bytes();
        if bytes.len() > AES_BLOCK_BYTES {
            return Err(GroverError::oracle(format!(
                "plaintext is {} bytes, at most {} fit in one block",
                bytes.len(),
                AES_BLOCK_BYTES
            )));
        }
        let mut padded = [0u8; AES_BLOCK_BYTES];
        padded[..bytes.len()].copy_from_slice(bytes);
        Ok(Self { plaintext: padded, ciphertext: parse_block_hex("ciphertext", ciphertext_hex)? })
    }

    /// True when `key` maps the plaintext onto the ciphertext.
    pub fn is_satisfied_by(&self, primitive: &dyn AesPrimitive, key: &Block) -> bool {
        primitive.encrypt(&self.plaintext, key) == self.ciphertext
    }
}

impl fmt::Display for PlaintextCiphertextPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", hex::encode(self.plaintext), hex::encode(self.ciphertext))
    }
}

/// A partially known AES-128 key: the low `unknown_bits` bits are searched,
/// the rest are taken from `base_key`.
///
/// Bits are counted from the end of the key, so candidate bit 0 is the
/// least significant bit of the last key byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpace {
    base_key: Block,
    unknown_bits: usize,
}

impl KeySpace {
    /// # Errors
    /// `OracleConstruction` if `unknown_bits` is zero or wider than the key.
    pub fn new(base_key: Block, unknown_bits: usize) -> Result<Self> {
        if unknown_bits == 0 || unknown_bits > AES_KEY_BITS {
            return Err(GroverError::oracle(format!(
                "key_bit_length must be within 1..={}, got {}",
                AES_KEY_BITS, unknown_bits
            )));
        }
        Ok(Self { base_key, unknown_bits })
    }

    pub fn unknown_bits(&self) -> usize {
        self.unknown_bits
    }

    pub fn base_key(&self) -> &Block {
        &self.base_key
    }

    /// Full AES key for candidate `k`; bits of `k` above `unknown_bits` are ignored.
    pub fn full_key(&self, candidate: u64) -> Block {
        let mut key = self.base_key;
        for bit in 0..self.unknown_bits.min(u64::BITS as usize) {
            let byte = AES_BLOCK_BYTES - 1 - bit / 8;
            let mask = 1u8 << (bit % 8);
            if (candidate >> bit) & 1 == 1 {
                key[byte] |= mask;
            } else {
                key[byte] &= !mask;
            }
        }
        key
    }

    /// Candidate value already present in `base_key`'s low bits.
    pub fn candidate_of(&self, key: &Block) -> u64 {
        (0..self.unknown_bits.min(u64::BITS as usize)).fold(0u64, |acc, bit| {
            let byte = AES_BLOCK_BYTES - 1 - bit / 8;
            let set = (key[byte] >> (bit % 8)) & 1 == 1;
            if set { acc | (1u64 << bit) } else { acc }
        })
    }
}

fn to_block(what: &str, bytes: &[u8]) -> Result<Block> {
    Block::try_from(bytes).map_err(|_| {
        GroverError::oracle(format!(
            "{} is {} bytes but the AES block size is {}",
            what,
            bytes.len(),
            AES_BLOCK_BYTES
        ))
    })
}

/// Decodes a 32-digit hex string into one block.
pub fn parse_block_hex(what: &str, text: &str) -> Result<Block> {
    let bytes = hex::decode(text.trim())
        .map_err(|e| GroverError::oracle(format!("{} is not valid hex: {}", what, e)))?;
    to_block(what, &bytes)
}
