// src/core/mod.rs

//! Core data structures and types

pub mod error;
pub mod register;
pub mod state;

pub use error::{GroverError, Result};
pub use register::{Register, dimension_of, required_bytes};
pub use state::AmplitudeState;

pub mod constants;
pub use constants::grover_constants::{AES_BLOCK_BYTES, AES_KEY_BITS, ANCILLA_TOLERANCE, NORM_TOLERANCE};
