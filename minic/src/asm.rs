//! Loader for the persisted instruction text format.
//!
//! ```text
//! # comment line
//! 0: LDC 6,3(0)  # Init FP
//! 1: ADD 0,1,0
//! ```
//!
//! Each instruction line holds an ordinal label, a mnemonic and three
//! integer operands. Punctuation between the fields is only decoration and
//! is stripped before the fields are read.
use std::fmt::{self, Display, Formatter};

use smol_str::SmolStr;

use crate::compile::{Instruction, Opcode, Program};

/// Parse instruction text back into a program.
pub fn load(text: &str) -> Result<Program, LoadError> {
    let mut instructions = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        let (code, comment) = match line.split_once('#') {
            Some((code, comment)) => (code, Some(comment.trim())),
            None => (line, None),
        };

        let fields = split_fields(code);
        let mut fields = fields.split_whitespace();
        let error = |kind| LoadError { line: line_no, kind };

        let label = fields.next().ok_or_else(|| error(LoadErrorKind::MissingOperand))?;
        match label.parse::<usize>() {
            Ok(label) if label == instructions.len() => {}
            _ => return Err(error(LoadErrorKind::BadLabel(SmolStr::new(label)))),
        }

        let mnemonic = fields.next().ok_or_else(|| error(LoadErrorKind::MissingOperand))?;
        let op = mnemonic
            .parse::<Opcode>()
            .map_err(|_| error(LoadErrorKind::UnknownMnemonic(SmolStr::new(mnemonic))))?;

        let mut operands = [0; 3];
        for operand in operands.iter_mut() {
            let field = fields.next().ok_or_else(|| error(LoadErrorKind::MissingOperand))?;
            *operand = field
                .parse::<i32>()
                .map_err(|_| error(LoadErrorKind::BadOperand(SmolStr::new(field))))?;
        }

        if let Some(field) = fields.next() {
            return Err(error(LoadErrorKind::TrailingField(SmolStr::new(field))));
        }

        let [r, s, t] = operands;
        let mut instr = Instruction::new(op, r, s, t);
        if let Some(comment) = comment.filter(|c| !c.is_empty()) {
            instr = instr.with_comment(comment);
        }
        instructions.push(instr);
    }

    log::debug!("loaded {} instructions", instructions.len());

    Ok(Program::new(instructions))
}

/// Replace everything but alphanumerics and the minus sign with spaces.
fn split_fields(code: &str) -> String {
    code.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { ' ' })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    /// One based line number.
    pub line: usize,
    pub kind: LoadErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadErrorKind {
    UnknownMnemonic(SmolStr),
    MissingOperand,
    BadOperand(SmolStr),
    /// Field left over after the three operands.
    TrailingField(SmolStr),
    /// Label is not the ordinal of the instruction.
    BadLabel(SmolStr),
}

impl std::error::Error for LoadError {}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: ", self.line)?;
        match &self.kind {
            LoadErrorKind::UnknownMnemonic(name) => write!(f, "unknown mnemonic '{}'", name),
            LoadErrorKind::MissingOperand => write!(f, "missing operand"),
            LoadErrorKind::BadOperand(field) => write!(f, "operand '{}' is not an integer", field),
            LoadErrorKind::TrailingField(field) => write!(f, "unexpected field '{}' after operands", field),
            LoadErrorKind::BadLabel(label) => write!(f, "unexpected label '{}'", label),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_load_both_families() {
        let program = load("0: LDC 6,3(0)  # Init FP\n1: ADD 0,1,0\n2: ST 0,-2(6)\n").unwrap();

        assert_eq!(program.len(), 3);
        assert_eq!(program.instructions[0], Instruction::new(Opcode::Ldc, 6, 3, 0).with_comment("Init FP"));
        assert_eq!(program.instructions[1], Instruction::new(Opcode::Add, 0, 1, 0));
        assert_eq!(program.instructions[2], Instruction::new(Opcode::St, 0, -2, 6));
    }

    #[test]
    fn test_skip_comments_and_blanks() {
        let program = load("# header\n\n   \n0: HALT 0,0,0  # Program End\n# trailer\n").unwrap();
        assert_eq!(program.len(), 1);
        assert_eq!(program.instructions[0].op, Opcode::Halt);
    }

    #[test]
    fn test_text_round_trip() {
        let program = Program::new(vec![
            Instruction::new(Opcode::Ldc, 6, 2, 0).with_comment("Init FP"),
            Instruction::new(Opcode::Jge, 0, 1, 7).with_comment("Check Negative Array Offset"),
            Instruction::new(Opcode::Halt, -1, 0, 0),
            Instruction::new(Opcode::Ld, 7, -2, 2),
        ]);
        assert_eq!(load(&program.to_string()).unwrap(), program);
    }

    #[test]
    fn test_unknown_mnemonic() {
        let err = load("0: HALT 0,0,0\n1: MOV 0,1,2\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.kind, LoadErrorKind::UnknownMnemonic("MOV".into()));
    }

    #[test]
    fn test_malformed_lines() {
        assert_eq!(load("0: ADD 0,1").unwrap_err().kind, LoadErrorKind::MissingOperand);
        assert_eq!(
            load("0: LD 0,x(6)").unwrap_err().kind,
            LoadErrorKind::BadOperand("x".into())
        );
        assert_eq!(load("3: IN 0,0,0").unwrap_err().kind, LoadErrorKind::BadLabel("3".into()));
    }

    #[test]
    fn test_trailing_fields() {
        let err = load("0: ADD 0,1,2,3").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.kind, LoadErrorKind::TrailingField("3".into()));
        assert_eq!(
            load("0: LD 0,1(6) 7  # Load").unwrap_err().kind,
            LoadErrorKind::TrailingField("7".into())
        );
    }
}
