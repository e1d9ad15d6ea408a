//! Text renderings of a tape: infix/call-style formulas, LaTeX, and a
//! numbered tape listing. Everything here works off the read-only tape
//! surface; no evaluation semantics are re-derived.

use std::fmt::Write;

use crate::operator::Operator;
use crate::program::{Instruction, Program};

/// Plain-text formula for the value of the final tape row.
pub fn string_formula(program: &Program) -> String {
    render(program, |operator, args| match operator {
        Operator::Add => format!("({} + {})", args[0], args[1]),
        Operator::Sub => format!("({} - {})", args[0], args[1]),
        Operator::Mul => format!("({} * {})", args[0], args[1]),
        Operator::Div => format!("({} / {})", args[0], args[1]),
        Operator::AbsSqrt => format!("sqrt(abs({}))", args[0]),
        Operator::Neg => format!("-({})", args[0]),
        Operator::Sin | Operator::Cos | Operator::Tan => {
            format!("{}({})", operator.name(), args[0])
        }
        Operator::IfGt | Operator::IfLt | Operator::IfEq => format!(
            "{}({}, {}, {}, {})",
            operator.name(),
            args[0],
            args[1],
            args[2],
            args[3]
        ),
    })
}

/// LaTeX formula for the value of the final tape row.
pub fn latex_formula(program: &Program) -> String {
    render(program, |operator, args| match operator {
        Operator::Add => format!("({}+{})", args[0], args[1]),
        Operator::Sub => format!("({}-{})", args[0], args[1]),
        Operator::Mul => format!(r"({}\cdot {})", args[0], args[1]),
        Operator::Div => format!(r"\frac{{{}}}{{{}}}", args[0], args[1]),
        Operator::AbsSqrt => format!(r"\sqrt{{\lvert {}\rvert }}", args[0]),
        Operator::Neg => format!("-({})", args[0]),
        Operator::Sin => format!(r"\sin ({})", args[0]),
        Operator::Cos => format!(r"\cos ({})", args[0]),
        Operator::Tan => format!(r"\tan ({})", args[0]),
        Operator::IfGt => guarded_choice(">", args),
        Operator::IfLt => guarded_choice("<", args),
        Operator::IfEq => guarded_choice("==", args),
    })
}

fn guarded_choice(relation: &str, args: &[&str]) -> String {
    format!(
        r"\big [ \big ({}{}{}\big )\rightarrow \big ({}\big ) ? \big ({}\big ) \big ]",
        args[0], relation, args[1], args[2], args[3]
    )
}

/// Numbered tape listing: the terminal prefix followed by one line per
/// operation row with its operator and operand slots.
pub fn format_tape(program: &Program) -> String {
    let mut out = String::new();
    for (position, instruction) in program.instructions().iter().enumerate() {
        match instruction {
            Instruction::Terminal { param } => {
                let _ = writeln!(out, "{position:4}. {}", program.parameters()[*param]);
            }
            Instruction::Operation { operator, operands } => {
                let _ = writeln!(out, "{position:4}. {:<10} {operands:?}", operator.name());
            }
        }
    }
    out
}

/// Bottom-up render over the tape. Rows only reference earlier rows, so one
/// forward pass has every sub-formula ready when it is needed.
fn render(program: &Program, combine: impl Fn(Operator, &[&str]) -> String) -> String {
    let mut formulas: Vec<String> = Vec::with_capacity(program.len());
    for instruction in program.instructions() {
        let rendered = match instruction {
            Instruction::Terminal { param } => program.parameters()[*param].clone(),
            Instruction::Operation { operator, operands } => {
                let args: Vec<&str> = operands
                    .iter()
                    .take(operator.used_slots())
                    .map(|&slot| formulas[slot].as_str())
                    .collect();
                combine(*operator, &args)
            }
        };
        formulas.push(rendered);
    }
    formulas.pop().expect("tape is never empty")
}
