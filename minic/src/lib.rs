pub mod asm;
pub mod ast;
pub mod compile;
pub mod constants;
mod cpu;
pub mod devices;
mod error;
pub mod lex;
pub mod parsing;
pub mod token_stream;
pub mod tokens;
mod vm;

/// Version of the toolchain.
pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub use self::{
    error::{Diagnostic, MinicError, MinicResult, Phase},
    vm::{Exit, Fault, Flow, Vm, VmConf},
};

pub mod prelude {
    pub use super::{
        asm::load,
        compile::{CodeGen, Instruction, Mapper, Opcode, Program, SymbolTable, TypeChecker},
        compile_str,
        devices::{BufferDevices, Devices, StdDevices},
        error::{Diagnostic, MinicError, MinicResult, Phase},
        lex::Lexer,
        parsing::parse,
        vm::{Exit, Fault, Flow, Vm, VmConf},
    };
}

/// Runs every compiler phase over `source`, stopping at the first phase
/// that reports diagnostics.
pub fn compile_str(source: &str) -> MinicResult<compile::Program> {
    // Lexical analysis
    let tokens = lex::Lexer::new(source).scan().into_result()?;

    // Syntactic analysis
    let mut tree = parsing::parse(&tokens).into_result()?;

    // Semantic analysis
    let symbols = compile::Mapper::new().build_symbols(&mut tree).into_result()?;
    compile::TypeChecker::new(&symbols).check(&mut tree).into_result()?;

    // Code generation
    let program = compile::CodeGen::new(&symbols).compile(&tree)?;

    Ok(program)
}
