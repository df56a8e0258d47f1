// src/circuits/qasm.rs

//! OpenQASM 3 text for remote submission, and the matching reader.
//!
//! Only the subset this crate emits is understood: one `qubit[N] q`
//! register, one `bit[n] c` register measuring the first `n` qubits, and the
//! gates `h`, `x`, `z`, `cx`, `cz`, `ccx` plus `ctrl(k) @ x|z`.

use super::Circuit;
use crate::core::{GroverError, Result};
use crate::gates::Gate;

impl Circuit {
    /// Serializes the circuit as OpenQASM 3 text, measuring the key qubits
    /// into `c` at the end. Checkpoints are dropped.
    ///
    /// `ZeroReflection` is emitted as X-conjugated multi-controlled Z, which
    /// equals the simulated reflection up to a global phase of -1.
    pub fn to_qasm(&self) -> String {
        let mut lines = vec![
            "OPENQASM 3.0;".to_string(),
            "include \"stdgates.inc\";".to_string(),
            format!("qubit[{}] q;", self.total_qubits()),
            format!("bit[{}] c;", self.key_qubits()),
        ];

        for gate in self.gates() {
            match gate {
                Gate::Hadamard { target } => lines.push(format!("h q[{}];", target)),
                Gate::PauliX { target } => lines.push(format!("x q[{}];", target)),
                Gate::MultiControlledX { controls, target } => lines.push(controlled("x", controls, *target)),
                Gate::MultiControlledZ { qubits } => {
                    if let Some((last, controls)) = qubits.split_last() {
                        lines.push(controlled("z", controls, *last));
                    }
                }
                Gate::ZeroReflection { qubits } => {
                    if let Some((last, controls)) = qubits.split_last() {
                        lines.extend(qubits.iter().map(|q| format!("x q[{}];", q)));
                        lines.push(controlled("z", controls, *last));
                        lines.extend(qubits.iter().map(|q| format!("x q[{}];", q)));
                    }
                }
                Gate::Checkpoint(_) => {}
            }
        }

        lines.extend((0..self.key_qubits()).map(|q| format!("c[{}] = measure q[{}];", q, q)));
        lines.push(String::new());
        lines.join("\n")
    }

    /// Parses text produced by [`Circuit::to_qasm`].
    ///
    /// # Errors
    /// `OracleConstruction` naming the offending line for anything outside
    /// the supported subset.
    pub fn from_qasm(text: &str) -> Result<Circuit> {
        let mut total: Option<usize> = None;
        let mut measured: Option<usize> = None;
        let mut gates = Vec::new();

        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.split("//").next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let err = |what: &str| GroverError::oracle(format!("OpenQASM line {}: {} in `{}`", line_no + 1, what, line));
            let stmt = line.strip_suffix(';').ok_or_else(|| err("missing `;`"))?.trim();

            if stmt.starts_with("OPENQASM") || stmt.starts_with("include") {
                continue;
            }
            if let Some(size) = stmt.strip_prefix("qubit[").and_then(|s| s.strip_suffix("] q")) {
                total = Some(size.parse().map_err(|_| err("bad qubit register size"))?);
                continue;
            }
            if let Some(size) = stmt.strip_prefix("bit[").and_then(|s| s.strip_suffix("] c")) {
                measured = Some(size.parse().map_err(|_| err("bad bit register size"))?);
                continue;
            }

            let total = total.ok_or_else(|| err("gate before qubit declaration"))?;
            if let Some((lhs, rhs)) = stmt.split_once("= measure") {
                let bit = index_of(lhs.trim(), "c").ok_or_else(|| err("bad measurement target"))?;
                let qubit = index_of(rhs.trim(), "q").ok_or_else(|| err("bad measured qubit"))?;
                if bit != qubit || bit >= measured.unwrap_or(0) {
                    return Err(err("only c[i] = measure q[i] over the key register is supported"));
                }
                continue;
            }

            let (name, operands) = stmt.split_once(' ').ok_or_else(|| err("missing operands"))?;
            let (name, operands) = match name.strip_prefix("ctrl(").and_then(|s| s.strip_suffix(')')) {
                Some(_) => {
                    let rest = operands.trim().strip_prefix("@").ok_or_else(|| err("expected `@`"))?.trim();
                    rest.split_once(' ').ok_or_else(|| err("missing operands"))?
                }
                None => (name, operands),
            };
            let qubits: Vec<usize> = operands
                .split(',')
                .map(|op| index_of(op.trim(), "q").filter(|q| *q < total))
                .collect::<Option<_>>()
                .ok_or_else(|| err("bad qubit operand"))?;

            let gate = match (name, qubits.as_slice()) {
                ("h", [t]) => Gate::Hadamard { target: *t },
                ("x", [t]) => Gate::PauliX { target: *t },
                ("x" | "cx" | "ccx", [controls @ .., t]) if !controls.is_empty() => {
                    Gate::MultiControlledX { controls: controls.to_vec(), target: *t }
                }
                ("z" | "cz", [_, ..]) => Gate::MultiControlledZ { qubits: qubits.clone() },
                _ => return Err(err("unsupported gate")),
            };
            gates.push(gate);
        }

        let total = total.ok_or_else(|| GroverError::oracle("OpenQASM text declares no qubit register"))?;
        let key = measured.unwrap_or(0);
        if key > total {
            return Err(GroverError::oracle("OpenQASM bit register is wider than the qubit register"));
        }
        let mut circuit = Circuit::new(key, total - key);
        circuit.add_gates(gates);
        Ok(circuit)
    }
}

/// `ctrl(k) @ g q[c0], ..., q[t];`, with the `c`/bare spellings for k < 2.
fn controlled(gate: &str, controls: &[usize], target: usize) -> String {
    let operands: Vec<String> = controls.iter().chain(std::iter::once(&target)).map(|q| format!("q[{}]", q)).collect();
    match controls.len() {
        0 => format!("{} {};", gate, operands.join(", ")),
        1 => format!("c{} {};", gate, operands.join(", ")),
        k => format!("ctrl({}) @ {} {};", k, gate, operands.join(", ")),
    }
}

/// Parses `name[i]`.
fn index_of(operand: &str, register: &str) -> Option<usize> {
    operand.strip_prefix(register)?.strip_prefix('[')?.strip_suffix(']')?.parse().ok()
}
