mod codegen;
mod ir;
mod mapper;
mod symbol;
mod typeck;

pub use codegen::CodeGen;
pub use ir::{Family, Instruction, Opcode, Program};
pub use mapper::{Mapped, Mapper};
pub use symbol::{signature, Builtin, ParamKind, ReturnKind, Storage, Symbol, SymbolId, SymbolKind, SymbolTable};
pub use typeck::{Checked, TypeChecker};

use crate::ast::NodeKind;
use smol_str::SmolStr;
use std::{error, fmt};

/// Failure to lower a tree that passed the semantic phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    /// No function named `main` is defined.
    MissingMain,
    /// Call to a function with no emitted entry point.
    UnknownFunction(SmolStr),
    /// Reference left without a symbol by the mapper.
    Unresolved(SmolStr),
    /// Number literal that does not fit a machine word.
    BadLiteral(SmolStr),
    /// Expression node is missing a required child.
    MissingOperand,
    /// Frame offsets no longer fit a machine word.
    FrameTooLarge,
    Unsupported(NodeKind),
}

impl error::Error for CodegenError {}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CodegenError::MissingMain => write!(f, "program does not define a main function"),
            CodegenError::UnknownFunction(name) => write!(f, "call to function '{}' without an entry point", name),
            CodegenError::Unresolved(name) => write!(f, "unresolved symbol '{}'", name),
            CodegenError::BadLiteral(lexeme) => write!(f, "number '{}' is out of range", lexeme),
            CodegenError::MissingOperand => write!(f, "expression is missing an operand"),
            CodegenError::FrameTooLarge => write!(f, "frame offset is out of range"),
            CodegenError::Unsupported(kind) => write!(f, "can't generate code for {:?} node", kind),
        }
    }
}
