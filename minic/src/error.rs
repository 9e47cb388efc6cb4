//! Result and errors.
use std::{
    fmt::{self, Display, Formatter},
    io,
    string::FromUtf8Error,
};

use smol_str::SmolStr;

use crate::{asm::LoadError, compile::CodegenError, tokens::Pos};

pub type MinicResult<T> = std::result::Result<T, MinicError>;

#[derive(Debug)]
pub enum MinicError {
    /// A compile phase finished with diagnostics.
    Compile { phase: Phase, diagnostics: Vec<Diagnostic> },
    /// Code generation could not lower a checked program.
    Codegen(CodegenError),
    /// Persisted instruction text could not be loaded.
    Load(LoadError),
    Io(io::Error),
    Utf8(FromUtf8Error),
    Fmt(fmt::Error),
}

impl Display for MinicError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compile { phase, diagnostics } => {
                write!(f, "{} failed with {} error(s)", phase, diagnostics.len())?;
                for diagnostic in diagnostics {
                    write!(f, "\n  {}", diagnostic)?;
                }
                Ok(())
            }
            Self::Codegen(err) => write!(f, "code generation error: {}", err),
            Self::Load(err) => write!(f, "load error: {}", err),
            Self::Io(err) => write!(f, "{}", err),
            Self::Utf8(err) => write!(f, "{}", err),
            Self::Fmt(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for MinicError {}

impl From<io::Error> for MinicError {
    fn from(err: io::Error) -> Self {
        MinicError::Io(err)
    }
}

impl From<FromUtf8Error> for MinicError {
    fn from(err: FromUtf8Error) -> Self {
        MinicError::Utf8(err)
    }
}

impl From<fmt::Error> for MinicError {
    fn from(err: fmt::Error) -> Self {
        MinicError::Fmt(err)
    }
}

impl From<CodegenError> for MinicError {
    fn from(err: CodegenError) -> Self {
        MinicError::Codegen(err)
    }
}

impl From<LoadError> for MinicError {
    fn from(err: LoadError) -> Self {
        MinicError::Load(err)
    }
}

/// Compiler phase that reported a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lexical,
    Syntax,
    Symbol,
    Type,
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexical => write!(f, "lexical analysis"),
            Self::Syntax => write!(f, "parsing"),
            Self::Symbol => write!(f, "symbol resolution"),
            Self::Type => write!(f, "type checking"),
        }
    }
}

/// Positioned message accumulated by a compiler phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub phase: Phase,
    pub message: &'static str,
    /// Source text of the offending token.
    pub lexeme: SmolStr,
    pub pos: Pos,
}

impl Diagnostic {
    /// Builds the diagnostic and logs it straight away.
    pub fn report(phase: Phase, message: &'static str, lexeme: impl Into<SmolStr>, pos: Pos) -> Self {
        let diagnostic = Diagnostic {
            phase,
            message,
            lexeme: lexeme.into(),
            pos,
        };
        log::error!("{}", diagnostic);
        diagnostic
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' at ({},{})", self.message, self.lexeme, self.pos.row, self.pos.col)
    }
}

/// Converts a phase's diagnostics into an error when any were reported.
pub(crate) fn check_phase(phase: Phase, diagnostics: Vec<Diagnostic>) -> MinicResult<()> {
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(MinicError::Compile { phase, diagnostics })
    }
}
