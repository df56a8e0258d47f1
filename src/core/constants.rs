//! Numerical and cipher constants shared by the engine.

/// Constants of the search engine
pub mod grover_constants {
    /// Bytes in one AES block, and in an AES-128 key.
    pub const AES_BLOCK_BYTES: usize = 16;
    /// Bits in an AES-128 key.
    pub const AES_KEY_BITS: usize = 128;
    /// Allowed deviation of the squared norm from 1.0.
    pub const NORM_TOLERANCE: f64 = 1e-9;
    /// Probability mass outside the ancilla-zero subspace tolerated after uncompute.
    pub const ANCILLA_TOLERANCE: f64 = 1e-9;
    /// Bytes per amplitude (`Complex<f64>`).
    pub const AMPLITUDE_BYTES: usize = 16;
}
