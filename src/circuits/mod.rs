// src/circuits/mod.rs

//! Defines structures for representing and building ordered gate sequences
//! over a key-space register.
//!
//! A `Circuit` is the unit handed to an execution backend: the local backend
//! walks its gates directly, the remote backend serializes it with
//! [`Circuit::to_qasm`].

use crate::gates::{Checkpoint, Gate};
use std::fmt;

mod qasm;

/// An ordered list of gates over `key_qubits + ancilla_qubits` qubits.
///
/// Analogy: Similar to `qiskit.QuantumCircuit` with one key register and
/// one ancilla register.
#[derive(Clone, PartialEq, Eq)]
pub struct Circuit {
    key_qubits: usize,
    ancilla_qubits: usize,
    gates: Vec<Gate>,
}

impl Circuit {
    /// Creates an empty circuit over the given register shape.
    pub fn new(key_qubits: usize, ancilla_qubits: usize) -> Self {
        Self {
            key_qubits,
            ancilla_qubits,
            gates: Vec::new(),
        }
    }

    /// Appends one gate.
    pub fn add_gate(&mut self, gate: Gate) {
        self.gates.push(gate);
    }

    /// Appends every gate from an iterator, in order.
    pub fn add_gates<I>(&mut self, gates: I)
    where
        I: IntoIterator<Item = Gate>,
    {
        self.gates.extend(gates);
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn key_qubits(&self) -> usize {
        self.key_qubits
    }

    pub fn ancilla_qubits(&self) -> usize {
        self.ancilla_qubits
    }

    pub fn total_qubits(&self) -> usize {
        self.key_qubits + self.ancilla_qubits
    }

    /// Total number of entries, checkpoints included.
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// Number of actual quantum operations (checkpoints excluded).
    pub fn gate_count(&self) -> usize {
        self.gates.iter().filter(|g| !g.is_checkpoint()).count()
    }

    /// Inverse circuit. Every gate in the alphabet is self-inverse, so this
    /// is the gate list reversed.
    pub fn inverse(&self) -> Circuit {
        Circuit {
            key_qubits: self.key_qubits,
            ancilla_qubits: self.ancilla_qubits,
            gates: self.gates.iter().rev().filter(|g| !g.is_checkpoint()).cloned().collect(),
        }
    }
}

//-------------------------------------------------------------------------
// Circuit Builder
//-------------------------------------------------------------------------

/// A helper struct for programmatically constructing `Circuit` instances using method chaining.
pub struct CircuitBuilder {
    circuit: Circuit,
}

impl CircuitBuilder {
    /// Creates a builder for a register of `key_qubits` key and `ancilla_qubits` ancilla qubits.
    pub fn new(key_qubits: usize, ancilla_qubits: usize) -> Self {
        Self { circuit: Circuit::new(key_qubits, ancilla_qubits) }
    }

    /// Adds a single gate to the circuit being built.
    ///
    /// Returns `self` to allow for continued method chaining.
    pub fn add_op(mut self, gate: Gate) -> Self {
        self.circuit.add_gate(gate);
        self
    }

    /// Adds multiple gates from an iterator to the circuit being built.
    ///
    /// Returns `self` to allow for continued method chaining.
    pub fn add_ops<I>(mut self, gates: I) -> Self
    where
        I: IntoIterator<Item = Gate>,
    {
        self.circuit.add_gates(gates);
        self
    }

    /// Appends every gate of another circuit.
    pub fn append(mut self, other: &Circuit) -> Self {
        self.circuit.add_gates(other.gates().iter().cloned());
        self
    }

    /// Adds an invariant checkpoint marker.
    pub fn checkpoint(self, checkpoint: Checkpoint) -> Self {
        self.add_op(Gate::Checkpoint(checkpoint))
    }

    /// Finalizes the construction process and returns the built `Circuit`.
    pub fn build(self) -> Circuit {
        self.circuit
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let num_rows = self.total_qubits();
        if self.gates.is_empty() || num_rows == 0 {
            return writeln!(f, "Circuit[0 gates on {} qubits]", num_rows);
        }

        let num_cols = self.gates.len();
        let labels: Vec<String> = (0..num_rows)
            .map(|q| if q < self.key_qubits { format!("k{}", q) } else { format!("a{}", q - self.key_qubits) })
            .collect();
        let label_width = labels.iter().map(|l| l.len()).max().unwrap_or(0) + 2;

        const GATE_WIDTH: usize = 7;
        const WIRE: &str = "───────";
        const V_WIRE: char = '│';
        const H_WIRE: char = '─';

        // grid[row][column] is the wire segment; links[row][column] the connector below it
        let mut grid: Vec<Vec<String>> = vec![vec![WIRE.to_string(); num_cols]; num_rows];
        let mut links: Vec<Vec<char>> = vec![vec![' '; num_cols]; num_rows];

        fn format_gate(symbol: &str) -> String {
            let len = symbol.chars().count();
            if len >= GATE_WIDTH {
                symbol.chars().take(GATE_WIDTH).collect()
            } else {
                let pre = (GATE_WIDTH - len) / 2;
                let post = GATE_WIDTH - len - pre;
                format!("{}{}{}", H_WIRE.to_string().repeat(pre), symbol, H_WIRE.to_string().repeat(post))
            }
        }

        fn connect(links: &mut [Vec<char>], rows: &[usize], t: usize) {
            if let (Some(min), Some(max)) = (rows.iter().min(), rows.iter().max()) {
                for row in links.iter_mut().take(*max).skip(*min) {
                    row[t] = V_WIRE;
                }
            }
        }

        for (t, gate) in self.gates.iter().enumerate() {
            match gate {
                Gate::Hadamard { target } if *target < num_rows => grid[*target][t] = format_gate("H"),
                Gate::PauliX { target } if *target < num_rows => grid[*target][t] = format_gate("X"),
                Gate::MultiControlledX { controls, target } => {
                    let mut rows: Vec<usize> = controls.iter().copied().filter(|q| *q < num_rows).collect();
                    for r in &rows {
                        grid[*r][t] = format_gate("@");
                    }
                    if *target < num_rows {
                        grid[*target][t] = format_gate("X");
                        rows.push(*target);
                    }
                    connect(&mut links, &rows, t);
                }
                Gate::MultiControlledZ { qubits } => {
                    let rows: Vec<usize> = qubits.iter().copied().filter(|q| *q < num_rows).collect();
                    for r in &rows {
                        grid[*r][t] = format_gate("●");
                    }
                    connect(&mut links, &rows, t);
                }
                Gate::ZeroReflection { qubits } => {
                    let rows: Vec<usize> = qubits.iter().copied().filter(|q| *q < num_rows).collect();
                    for r in &rows {
                        grid[*r][t] = format_gate("R0");
                    }
                    connect(&mut links, &rows, t);
                }
                Gate::Checkpoint(_) => {
                    for row in grid.iter_mut() {
                        row[t] = format_gate("┊");
                    }
                }
                _ => {}
            }
        }

        writeln!(
            f,
            "Circuit[{} gates on {} key + {} ancilla qubits]",
            self.gate_count(),
            self.key_qubits,
            self.ancilla_qubits
        )?;
        for r in 0..num_rows {
            write!(f, "{:<width$}", format!("{}: ", labels[r]), width = label_width)?;
            writeln!(f, "{}", grid[r].join(""))?;
            if r + 1 < num_rows {
                write!(f, "{}", " ".repeat(label_width))?;
                for t in 0..num_cols {
                    let pad = GATE_WIDTH - 1;
                    write!(f, "{}{}{}", " ".repeat(pad / 2), links[r][t], " ".repeat(pad - pad / 2))?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

// Keep the Debug impl delegating to Display
impl fmt::Debug for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
