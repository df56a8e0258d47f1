// src/validation/mod.rs

//! Provides functions to validate the amplitude state at circuit checkpoints.

use crate::core::{ANCILLA_TOLERANCE, AmplitudeState, GroverError, NORM_TOLERANCE, Register, Result};

/// Checks that the state vector is normalized (sum of squared amplitudes ≈ 1.0).
///
/// # Arguments
/// * `state` - The `AmplitudeState` to check.
/// * `tolerance` - Allowed deviation from 1.0. `None` uses [`NORM_TOLERANCE`].
///
/// # Returns
/// * `Ok(())` if normalized within tolerance.
/// * `Err(GroverError::Incoherence)` otherwise.
pub fn check_normalization(state: &AmplitudeState, tolerance: Option<f64>) -> Result<()> {
    let tolerance = tolerance.unwrap_or(NORM_TOLERANCE);
    let norm = state.norm_sqr();
    if (norm - 1.0).abs() > tolerance || !norm.is_finite() {
        return Err(GroverError::Incoherence { norm });
    }
    Ok(())
}

/// Checks that every ancilla qubit is back at |0>.
///
/// # Errors
/// `AncillaLeakage` carrying the residual probability when it exceeds the
/// tolerance (`None` uses [`ANCILLA_TOLERANCE`]).
pub fn check_ancilla_restored(register: &Register, tolerance: Option<f64>) -> Result<()> {
    if register.ancilla_qubits() == 0 {
        return Ok(());
    }
    let tolerance = tolerance.unwrap_or(ANCILLA_TOLERANCE);
    let residual = register.ancilla_residual();
    if residual > tolerance {
        return Err(GroverError::AncillaLeakage { residual });
    }
    Ok(())
}

/// Runs both checks.
pub fn validate_register(register: &Register) -> Result<()> {
    check_normalization(register.state(), None)?;
    check_ancilla_restored(register, None)
}
