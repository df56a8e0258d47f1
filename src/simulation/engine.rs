// src/simulation/engine.rs

//! Matrix-free kernels acting in place on a dense amplitude vector.
//!
//! Each kernel touches every amplitude at most once and has no dependency
//! between independent index pairs, so the work is split across the rayon
//! pool. Kernels are applied strictly one after another by the caller.

use crate::core::{AmplitudeState, GroverError, Result};
use crate::gates::Gate;
use num_complex::Complex64;
use rayon::prelude::*;
use std::f64::consts::FRAC_1_SQRT_2;

/// Chunks smaller than this are not worth a rayon task of their own.
const MIN_PARALLEL_LEN: usize = 1 << 10;

/// Applies a single non-checkpoint gate to `state`.
///
/// # Errors
/// `OracleConstruction` if the gate addresses a qubit outside the state, or
/// if a controlled gate uses its target as a control.
pub(crate) fn apply_gate(state: &mut AmplitudeState, gate: &Gate) -> Result<()> {
    let num_qubits = state.num_qubits();
    if let Some(q) = gate.involved_qubits().into_iter().find(|q| *q >= num_qubits) {
        return Err(GroverError::oracle(format!(
            "gate `{}` addresses qubit {} but the register has {} qubits",
            gate, q, num_qubits
        )));
    }

    let amps = state.amplitudes_mut();
    match gate {
        Gate::Hadamard { target } => hadamard(amps, *target),
        Gate::PauliX { target } => controlled_x(amps, 0, *target),
        Gate::MultiControlledX { controls, target } => {
            if controls.contains(target) {
                return Err(GroverError::oracle(format!(
                    "controlled X on q[{}] lists its own target as a control",
                    target
                )));
            }
            controlled_x(amps, mask_of(controls), *target);
        }
        Gate::MultiControlledZ { qubits } => {
            if qubits.is_empty() {
                return Err(GroverError::oracle("multi-controlled Z needs at least one qubit"));
            }
            phase_flip_all_ones(amps, mask_of(qubits));
        }
        Gate::ZeroReflection { qubits } => zero_reflection(amps, mask_of(qubits)),
        Gate::Checkpoint(_) => {}
    }
    Ok(())
}

/// Bit mask with one bit set per listed qubit.
pub(crate) fn mask_of(qubits: &[usize]) -> usize {
    qubits.iter().fold(0usize, |mask, q| mask | (1usize << q))
}

/// Hadamard on qubit `target`.
///
/// The vector is cut into blocks of `2 << target` amplitudes; inside a block
/// the first half has the target bit clear and the second half has it set,
/// so the two halves pair up element by element.
pub(crate) fn hadamard(amps: &mut [Complex64], target: usize) {
    let stride = 1usize << target;
    let apply = |block: &mut [Complex64]| {
        let (low, high) = block.split_at_mut(stride);
        for (a0, a1) in low.iter_mut().zip(high.iter_mut()) {
            let (x, y) = (*a0, *a1);
            *a0 = (x + y) * FRAC_1_SQRT_2;
            *a1 = (x - y) * FRAC_1_SQRT_2;
        }
    };
    if amps.len() >= MIN_PARALLEL_LEN {
        amps.par_chunks_mut(stride << 1).for_each(apply);
    } else {
        amps.chunks_mut(stride << 1).for_each(apply);
    }
}

/// Swaps the target bit of every basis state whose `control_mask` bits are
/// all set. A zero mask is a plain X gate.
pub(crate) fn controlled_x(amps: &mut [Complex64], control_mask: usize, target: usize) {
    let stride = 1usize << target;
    let block_len = stride << 1;
    let apply = |(block_idx, block): (usize, &mut [Complex64])| {
        let base = block_idx * block_len;
        let (low, high) = block.split_at_mut(stride);
        for (offset, (a0, a1)) in low.iter_mut().zip(high.iter_mut()).enumerate() {
            // Index of the target-clear partner; control bits never include the target.
            if (base + offset) & control_mask == control_mask {
                std::mem::swap(a0, a1);
            }
        }
    };
    if amps.len() >= MIN_PARALLEL_LEN {
        amps.par_chunks_mut(block_len).enumerate().for_each(apply);
    } else {
        amps.chunks_mut(block_len).enumerate().for_each(apply);
    }
}

/// Negates amplitudes whose `mask` bits are all set.
pub(crate) fn phase_flip_all_ones(amps: &mut [Complex64], mask: usize) {
    amps.par_iter_mut()
        .with_min_len(MIN_PARALLEL_LEN)
        .enumerate()
        .filter(|(idx, _)| idx & mask == mask)
        .for_each(|(_, amp)| *amp = -*amp);
}

/// Negates amplitudes that have any `mask` bit set.
pub(crate) fn zero_reflection(amps: &mut [Complex64], mask: usize) {
    amps.par_iter_mut()
        .with_min_len(MIN_PARALLEL_LEN)
        .enumerate()
        .filter(|(idx, _)| idx & mask != 0)
        .for_each(|(_, amp)| *amp = -*amp);
}
