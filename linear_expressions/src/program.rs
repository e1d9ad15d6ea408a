use std::collections::HashMap;
use std::fmt;

use fastrand::Rng;
use num_traits::Float;

use crate::operator::{Operator, MIN_OPERANDS};

/// Smallest operation count a tape will be built with.
pub const MIN_OPERATIONS: usize = 3;

/// One tape row: either a named-input read or an operator application.
///
/// An operation carries a fixed-width operand-slot vector; only the leading
/// [`Operator::used_slots`] entries are consulted at evaluation time. The
/// remaining slots are carried as payload so that slot-level mutations have
/// material to work with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    Terminal { param: usize },
    Operation {
        operator: Operator,
        operands: Vec<usize>,
    },
}

#[derive(Clone, Debug)]
pub enum ProgramError {
    NoParameters,
    TooFewOperations { got: usize },
    TooFewOperands { got: usize },
    WrongInputCount { expected: usize, got: usize },
    UnknownParameter { name: String },
    MisplacedTerminal { position: usize },
    WrongOperandWidth {
        position: usize,
        got: usize,
        expected: usize,
    },
    ForwardReference { position: usize, operand: usize },
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramError::NoParameters => write!(f, "parameter list must be non-empty"),
            ProgramError::TooFewOperations { got } => {
                write!(f, "need at least {MIN_OPERATIONS} operations, got {got}")
            }
            ProgramError::TooFewOperands { got } => {
                write!(f, "need at least {MIN_OPERANDS} operand slots, got {got}")
            }
            ProgramError::WrongInputCount { expected, got } => {
                write!(f, "expected {expected} input values, got {got}")
            }
            ProgramError::UnknownParameter { name } => {
                write!(f, "input is missing parameter {name:?}")
            }
            ProgramError::MisplacedTerminal { position } => {
                write!(
                    f,
                    "tape position {position} does not match the terminal-prefix layout"
                )
            }
            ProgramError::WrongOperandWidth {
                position,
                got,
                expected,
            } => write!(
                f,
                "operation at position {position} has {got} operand slots but the tape width is {expected}"
            ),
            ProgramError::ForwardReference { position, operand } => write!(
                f,
                "operation at position {position} references slot {operand}, which is not below it"
            ),
        }
    }
}

impl std::error::Error for ProgramError {}

/// One candidate formula, encoded as a linear instruction tape.
///
/// The first `params_size` rows are terminals reading the named inputs in
/// order; every later row applies an operator to values already on the tape.
/// Invariant: the row at position `i` only references positions `< i`, so a
/// single left-to-right pass evaluates the whole tape. The invariant is
/// established by construction and preserved by [`Program::mutate`] and
/// [`Program::splice_prefix`].
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    parameters: Vec<String>,
    tape: Vec<Instruction>,
    operands_size: usize,
}

impl Program {
    /// Build a random tape over the given named inputs.
    ///
    /// Each operation row at position `i` draws a uniform operator and
    /// `operands_size` independent uniform slot values from `[0, i - 1]`.
    pub fn random(
        parameters: &[String],
        operations_size: usize,
        operands_size: usize,
        rng: &mut Rng,
    ) -> Result<Self, ProgramError> {
        if parameters.is_empty() {
            return Err(ProgramError::NoParameters);
        }
        if operations_size < MIN_OPERATIONS {
            return Err(ProgramError::TooFewOperations {
                got: operations_size,
            });
        }
        if operands_size < MIN_OPERANDS {
            return Err(ProgramError::TooFewOperands { got: operands_size });
        }

        let params_size = parameters.len();
        let mut tape = Vec::with_capacity(params_size + operations_size);
        for param in 0..params_size {
            tape.push(Instruction::Terminal { param });
        }
        for row in params_size..params_size + operations_size {
            let operands = (0..operands_size).map(|_| rng.usize(0..row)).collect();
            tape.push(Instruction::Operation {
                operator: Operator::sample(rng),
                operands,
            });
        }

        Ok(Self {
            parameters: parameters.to_vec(),
            tape,
            operands_size,
        })
    }

    /// Build a tape from explicit rows, validating the same shape rules as
    /// [`Program::random`] plus the backward-reference invariant.
    pub fn from_parts(
        parameters: Vec<String>,
        tape: Vec<Instruction>,
        operands_size: usize,
    ) -> Result<Self, ProgramError> {
        if parameters.is_empty() {
            return Err(ProgramError::NoParameters);
        }
        if operands_size < MIN_OPERANDS {
            return Err(ProgramError::TooFewOperands { got: operands_size });
        }
        let params_size = parameters.len();
        let operations = tape.len().saturating_sub(params_size);
        if operations < MIN_OPERATIONS {
            return Err(ProgramError::TooFewOperations { got: operations });
        }

        for (position, instruction) in tape.iter().enumerate() {
            match instruction {
                Instruction::Terminal { param } => {
                    if position >= params_size || *param != position {
                        return Err(ProgramError::MisplacedTerminal { position });
                    }
                }
                Instruction::Operation { operands, .. } => {
                    if position < params_size {
                        return Err(ProgramError::MisplacedTerminal { position });
                    }
                    if operands.len() != operands_size {
                        return Err(ProgramError::WrongOperandWidth {
                            position,
                            got: operands.len(),
                            expected: operands_size,
                        });
                    }
                    if let Some(&operand) = operands.iter().find(|&&o| o >= position) {
                        return Err(ProgramError::ForwardReference { position, operand });
                    }
                }
            }
        }

        Ok(Self {
            parameters,
            tape,
            operands_size,
        })
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Read-only view of the tape, enough to render or re-encode the formula
    /// without re-deriving evaluation semantics.
    pub fn instructions(&self) -> &[Instruction] {
        &self.tape
    }

    pub fn params_size(&self) -> usize {
        self.parameters.len()
    }

    pub fn operations_size(&self) -> usize {
        self.tape.len() - self.parameters.len()
    }

    pub fn operands_size(&self) -> usize {
        self.operands_size
    }

    pub fn len(&self) -> usize {
        self.tape.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tape.is_empty()
    }

    /// Evaluate the tape against one set of named input values.
    ///
    /// Allocates a fresh scratch buffer; hot loops should hold one and call
    /// [`Program::evaluate_with`] instead.
    pub fn evaluate<T: Float>(&self, values: &HashMap<String, T>) -> Result<T, ProgramError> {
        let mut scratch = Vec::with_capacity(self.tape.len());
        self.evaluate_with(values, &mut scratch)
    }

    /// Single left-to-right pass over the tape, reusing the caller's scratch
    /// buffer. The result is the value of the final tape row.
    ///
    /// The interpreter is total: division by an exact zero yields zero,
    /// square roots act on the operand's absolute value, and the select
    /// operators return the value of one of their branch slots. No numeric
    /// condition aborts the pass.
    pub fn evaluate_with<T: Float>(
        &self,
        values: &HashMap<String, T>,
        scratch: &mut Vec<T>,
    ) -> Result<T, ProgramError> {
        if values.len() != self.parameters.len() {
            return Err(ProgramError::WrongInputCount {
                expected: self.parameters.len(),
                got: values.len(),
            });
        }

        scratch.clear();
        for instruction in &self.tape {
            let value = match instruction {
                Instruction::Terminal { param } => {
                    let name = &self.parameters[*param];
                    *values
                        .get(name)
                        .ok_or_else(|| ProgramError::UnknownParameter { name: name.clone() })?
                }
                Instruction::Operation { operator, operands } => {
                    apply(*operator, operands, scratch)
                }
            };
            scratch.push(value);
        }

        Ok(*scratch.last().expect("tape is never empty"))
    }

    /// Apply exactly one structural edit to one uniformly chosen operation
    /// row: overwrite a random operand slot with a fresh draw from
    /// `[0, row - 1]`, cyclically rotate the operand slots, or redraw the
    /// operator. Slot replacements only ever draw below the row, so the
    /// backward-reference invariant survives any number of mutations.
    pub fn mutate(&mut self, rng: &mut Rng) {
        let row = rng.usize(self.parameters.len()..self.tape.len());
        let Instruction::Operation { operator, operands } = &mut self.tape[row] else {
            unreachable!("rows past the terminal prefix are operations");
        };
        match rng.usize(0..3) {
            0 => {
                let slot = rng.usize(0..operands.len());
                operands[slot] = rng.usize(0..row);
            }
            1 => {
                let split = rng.usize(0..operands.len());
                operands.rotate_left(split);
            }
            2 => *operator = Operator::sample(rng),
            _ => unreachable!(),
        }
    }

    /// Overwrite the first `len` tape rows with clones of the donor's rows.
    /// Both tapes must have the same shape; rows keep their positions, so the
    /// backward-reference invariant carries over from the donor.
    pub fn splice_prefix(&mut self, donor: &Program, len: usize) {
        assert_eq!(
            self.tape.len(),
            donor.tape.len(),
            "splice requires same-shape tapes"
        );
        assert_eq!(
            self.operands_size, donor.operands_size,
            "splice requires same-shape tapes"
        );
        assert!(len <= self.tape.len(), "splice length exceeds tape");
        self.tape[..len].clone_from_slice(&donor.tape[..len]);
    }
}

fn apply<T: Float>(operator: Operator, slots: &[usize], filled: &[T]) -> T {
    match operator {
        Operator::Add => filled[slots[0]] + filled[slots[1]],
        Operator::Sub => filled[slots[0]] - filled[slots[1]],
        Operator::Mul => filled[slots[0]] * filled[slots[1]],
        Operator::Div => {
            let divisor = filled[slots[1]];
            if divisor == T::zero() {
                T::zero()
            } else {
                filled[slots[0]] / divisor
            }
        }
        Operator::AbsSqrt => filled[slots[0]].abs().sqrt(),
        Operator::Neg => -filled[slots[0]],
        Operator::Sin => filled[slots[0]].sin(),
        Operator::Cos => filled[slots[0]].cos(),
        Operator::Tan => filled[slots[0]].tan(),
        Operator::IfGt => {
            if filled[slots[0]] > filled[slots[1]] {
                filled[slots[2]]
            } else {
                filled[slots[3]]
            }
        }
        Operator::IfLt => {
            if filled[slots[0]] < filled[slots[1]] {
                filled[slots[2]]
            } else {
                filled[slots[3]]
            }
        }
        Operator::IfEq => {
            if filled[slots[0]] == filled[slots[1]] {
                filled[slots[2]]
            } else {
                filled[slots[3]]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn values(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn op(operator: Operator, operands: &[usize]) -> Instruction {
        Instruction::Operation {
            operator,
            operands: operands.to_vec(),
        }
    }

    /// The three-input all-`add` tape: positions 0..3 are X, Y, Z.
    fn add_chain() -> Program {
        Program::from_parts(
            names(&["X", "Y", "Z"]),
            vec![
                Instruction::Terminal { param: 0 },
                Instruction::Terminal { param: 1 },
                Instruction::Terminal { param: 2 },
                op(Operator::Add, &[0, 1, 1, 1]),
                op(Operator::Add, &[1, 2, 0, 1]),
                op(Operator::Add, &[2, 3, 0, 4]),
                op(Operator::Add, &[0, 1, 3, 1]),
                op(Operator::Add, &[2, 6, 0, 5]),
            ],
            4,
        )
        .unwrap()
    }

    #[test]
    fn random_rejects_bad_shapes() {
        let mut rng = Rng::with_seed(0);
        assert!(matches!(
            Program::random(&[], 10, 10, &mut rng),
            Err(ProgramError::NoParameters)
        ));
        assert!(matches!(
            Program::random(&names(&["X"]), 2, 10, &mut rng),
            Err(ProgramError::TooFewOperations { got: 2 })
        ));
        assert!(matches!(
            Program::random(&names(&["X"]), 3, 0, &mut rng),
            Err(ProgramError::TooFewOperands { got: 0 })
        ));
        assert!(matches!(
            Program::random(&names(&["X"]), 3, 3, &mut rng),
            Err(ProgramError::TooFewOperands { got: 3 })
        ));
    }

    #[test]
    fn random_tape_shape_and_terminal_prefix() {
        let mut rng = Rng::with_seed(1);
        let params = names(&["X", "Y"]);
        let program = Program::random(&params, 5, 4, &mut rng).unwrap();

        assert_eq!(program.len(), 7);
        assert_eq!(program.params_size(), 2);
        assert_eq!(program.operations_size(), 5);

        for (i, instruction) in program.instructions().iter().take(2).enumerate() {
            assert_eq!(*instruction, Instruction::Terminal { param: i });
        }
        for (i, instruction) in program.instructions().iter().enumerate().skip(2) {
            let Instruction::Operation { operands, .. } = instruction else {
                panic!("expected an operation at position {i}");
            };
            assert_eq!(operands.len(), 4);
            assert!(operands.iter().all(|&o| o < i));
        }
    }

    #[test]
    fn mutation_preserves_backward_references() {
        let mut rng = Rng::with_seed(2);
        let params = names(&["A", "B", "C"]);
        let mut program = Program::random(&params, 12, 6, &mut rng).unwrap();

        for _ in 0..10_000 {
            program.mutate(&mut rng);
        }
        for (i, instruction) in program.instructions().iter().enumerate() {
            if let Instruction::Operation { operands, .. } = instruction {
                assert_eq!(operands.len(), 6);
                assert!(operands.iter().all(|&o| o < i), "violation at row {i}");
            }
        }
        for (i, instruction) in program.instructions().iter().take(3).enumerate() {
            assert_eq!(*instruction, Instruction::Terminal { param: i });
        }
    }

    #[test]
    fn mutation_usually_changes_the_tape() {
        let mut rng = Rng::with_seed(3);
        let params = names(&["A", "B"]);
        let mut changed = 0;
        for _ in 0..300 {
            let mut program = Program::random(&params, 6, 4, &mut rng).unwrap();
            let before = program.clone();
            program.mutate(&mut rng);
            if program != before {
                changed += 1;
            }
        }
        // A single exclusive edit can redraw the value already in place, but
        // only rarely.
        assert!(changed > 200, "only {changed}/300 mutations changed the tape");
    }

    #[test]
    fn clones_do_not_share_tape_state() {
        let mut rng = Rng::with_seed(4);
        let params = names(&["A", "B"]);
        let original = Program::random(&params, 6, 4, &mut rng).unwrap();
        let snapshot = original.clone();
        let mut copy = original.clone();
        for _ in 0..50 {
            copy.mutate(&mut rng);
        }
        assert_eq!(original, snapshot);
        assert_ne!(original, copy);
    }

    #[test]
    fn add_chain_evaluates_to_eleven() {
        let program = add_chain();
        let result: f64 = program
            .evaluate(&values(&[("X", 1.0), ("Y", 3.0), ("Z", 7.0)]))
            .unwrap();
        assert_eq!(result, 11.0);
    }

    #[test]
    fn division_by_zero_yields_zero() {
        let program = Program::from_parts(
            names(&["X", "Y", "Z"]),
            vec![
                Instruction::Terminal { param: 0 },
                Instruction::Terminal { param: 1 },
                Instruction::Terminal { param: 2 },
                op(Operator::Div, &[0, 1, 1, 1]),
                op(Operator::Div, &[1, 2, 0, 1]),
                op(Operator::Div, &[2, 3, 0, 4]),
                op(Operator::Div, &[0, 1, 3, 1]),
                op(Operator::Div, &[2, 6, 0, 5]),
            ],
            4,
        )
        .unwrap();
        let result: f64 = program
            .evaluate(&values(&[("X", 0.0), ("Y", 3.0), ("Z", 6.0)]))
            .unwrap();
        assert_eq!(result, 0.0);
    }

    #[test]
    fn abs_sqrt_takes_root_of_magnitude() {
        let program = Program::from_parts(
            names(&["X"]),
            vec![
                Instruction::Terminal { param: 0 },
                op(Operator::Neg, &[0, 0, 0, 0]),
                op(Operator::AbsSqrt, &[1, 0, 0, 0]),
                op(Operator::IfEq, &[0, 0, 2, 2]),
            ],
            4,
        )
        .unwrap();
        let result: f64 = program.evaluate(&values(&[("X", 4.0)])).unwrap();
        assert_eq!(result, 2.0);
    }

    #[test]
    fn selects_return_branch_values() {
        let program = Program::from_parts(
            names(&["X", "Y"]),
            vec![
                Instruction::Terminal { param: 0 },
                Instruction::Terminal { param: 1 },
                op(Operator::IfGt, &[0, 1, 0, 1]),
                op(Operator::IfLt, &[0, 1, 0, 1]),
                op(Operator::IfGt, &[2, 3, 2, 3]),
            ],
            4,
        )
        .unwrap();
        // Row 2 is max(x, y), row 3 is min(x, y), row 4 picks the max again.
        let result: f64 = program
            .evaluate(&values(&[("X", 7.0), ("Y", 3.0)]))
            .unwrap();
        assert_eq!(result, 7.0);
        let result: f64 = program
            .evaluate(&values(&[("X", 2.0), ("Y", 5.0)]))
            .unwrap();
        assert_eq!(result, 5.0);
    }

    #[test]
    fn evaluate_is_pure() {
        let mut rng = Rng::with_seed(5);
        let params = names(&["X", "Y"]);
        let program = Program::random(&params, 8, 4, &mut rng).unwrap();
        let input = values(&[("X", 1.25), ("Y", -3.5)]);
        let first: f64 = program.evaluate(&input).unwrap();
        for _ in 0..10 {
            let again: f64 = program.evaluate(&input).unwrap();
            assert_eq!(first.to_bits(), again.to_bits());
        }
    }

    #[test]
    fn evaluate_validates_inputs() {
        let program = add_chain();
        let too_few: HashMap<String, f64> = values(&[("X", 1.0)]);
        assert!(matches!(
            program.evaluate(&too_few),
            Err(ProgramError::WrongInputCount {
                expected: 3,
                got: 1
            })
        ));
        let wrong_names = values(&[("X", 1.0), ("Y", 2.0), ("W", 3.0)]);
        assert!(matches!(
            program.evaluate(&wrong_names),
            Err(ProgramError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn from_parts_rejects_malformed_tapes() {
        let params = names(&["X"]);
        let forward = vec![
            Instruction::Terminal { param: 0 },
            op(Operator::Add, &[0, 1, 0, 0]),
            op(Operator::Add, &[0, 0, 0, 0]),
            op(Operator::Add, &[0, 0, 0, 0]),
        ];
        assert!(matches!(
            Program::from_parts(params.clone(), forward, 4),
            Err(ProgramError::ForwardReference {
                position: 1,
                operand: 1
            })
        ));

        let narrow = vec![
            Instruction::Terminal { param: 0 },
            op(Operator::Add, &[0, 0]),
            op(Operator::Add, &[0, 0, 0, 0]),
            op(Operator::Add, &[0, 0, 0, 0]),
        ];
        assert!(matches!(
            Program::from_parts(params.clone(), narrow, 4),
            Err(ProgramError::WrongOperandWidth {
                position: 1,
                got: 2,
                expected: 4
            })
        ));

        let shuffled = vec![
            op(Operator::Add, &[0, 0, 0, 0]),
            Instruction::Terminal { param: 0 },
            op(Operator::Add, &[0, 0, 0, 0]),
            op(Operator::Add, &[0, 0, 0, 0]),
        ];
        assert!(matches!(
            Program::from_parts(params, shuffled, 4),
            Err(ProgramError::MisplacedTerminal { position: 0 })
        ));
    }

    #[test]
    fn splice_prefix_copies_donor_rows() {
        let mut rng = Rng::with_seed(6);
        let params = names(&["A", "B"]);
        let donor = Program::random(&params, 6, 4, &mut rng).unwrap();
        let mut child = Program::random(&params, 6, 4, &mut rng).unwrap();
        let suffix = child.instructions()[5..].to_vec();

        child.splice_prefix(&donor, 5);
        assert_eq!(child.instructions()[..5], donor.instructions()[..5]);
        assert_eq!(child.instructions()[5..], suffix[..]);
    }
}
