use fastrand::Rng;

/// Smallest operand-slot width able to feed the four-slot select operators.
pub const MIN_OPERANDS: usize = 4;

/// Closed set of tape operators. The set is fixed at compile time and never
/// extended at runtime.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    AbsSqrt,
    Neg,
    Sin,
    Cos,
    Tan,
    IfGt,
    IfLt,
    IfEq,
}

impl Operator {
    pub const ALL: [Operator; 12] = [
        Operator::Add,
        Operator::Sub,
        Operator::Mul,
        Operator::Div,
        Operator::AbsSqrt,
        Operator::Neg,
        Operator::Sin,
        Operator::Cos,
        Operator::Tan,
        Operator::IfGt,
        Operator::IfLt,
        Operator::IfEq,
    ];

    /// Number of leading operand slots the operator reads during evaluation.
    /// Slots past this count are inert payload.
    ///
    /// The select operators read four slots: two compared operands followed
    /// by the two branch values.
    pub const fn used_slots(self) -> usize {
        match self {
            Operator::Add | Operator::Sub | Operator::Mul | Operator::Div => 2,
            Operator::AbsSqrt
            | Operator::Neg
            | Operator::Sin
            | Operator::Cos
            | Operator::Tan => 1,
            Operator::IfGt | Operator::IfLt | Operator::IfEq => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Operator::Add => "add",
            Operator::Sub => "sub",
            Operator::Mul => "mul",
            Operator::Div => "div",
            Operator::AbsSqrt => "abs_sqrt",
            Operator::Neg => "neg",
            Operator::Sin => "sin",
            Operator::Cos => "cos",
            Operator::Tan => "tan",
            Operator::IfGt => "if_gt",
            Operator::IfLt => "if_lt",
            Operator::IfEq => "if_eq",
        }
    }

    /// Uniform draw over the full operator set.
    pub fn sample(rng: &mut Rng) -> Operator {
        Self::ALL[rng.usize(0..Self::ALL.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn used_slots_table() {
        for op in [Operator::Add, Operator::Sub, Operator::Mul, Operator::Div] {
            assert_eq!(op.used_slots(), 2);
        }
        for op in [
            Operator::AbsSqrt,
            Operator::Neg,
            Operator::Sin,
            Operator::Cos,
            Operator::Tan,
        ] {
            assert_eq!(op.used_slots(), 1);
        }
        for op in [Operator::IfGt, Operator::IfLt, Operator::IfEq] {
            assert_eq!(op.used_slots(), 4);
        }
    }

    #[test]
    fn used_slots_never_exceed_min_operands() {
        for op in Operator::ALL {
            assert!(op.used_slots() <= MIN_OPERANDS);
        }
    }

    #[test]
    fn sample_covers_the_whole_set() {
        let mut rng = Rng::with_seed(7);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1_000 {
            seen.insert(Operator::sample(&mut rng));
        }
        assert_eq!(seen.len(), Operator::ALL.len());
    }
}
