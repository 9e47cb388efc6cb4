//! Application errors
use std::fmt;

use minic::MinicError;

#[derive(Debug)]
pub struct AppError {
    pub kind: ErrorKind,
}

impl std::error::Error for AppError {}

#[derive(Debug)]
pub enum ErrorKind {
    Minic(MinicError),
    Io(std::io::Error),
    Config(serde_yaml::Error),
}

impl AppError {
    /// Process exit code, following the BSD `sysexits` convention.
    pub fn exit_code(&self) -> i32 {
        match &self.kind {
            // EX_DATAERR
            ErrorKind::Minic(MinicError::Compile { .. })
            | ErrorKind::Minic(MinicError::Codegen(_))
            | ErrorKind::Minic(MinicError::Load(_))
            | ErrorKind::Minic(MinicError::Utf8(_)) => 65,
            // EX_IOERR
            ErrorKind::Minic(_) | ErrorKind::Io(_) => 74,
            // EX_CONFIG
            ErrorKind::Config(_) => 78,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "application error: {}", self.kind)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minic(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "config: {err}"),
        }
    }
}

impl From<MinicError> for AppError {
    fn from(err: MinicError) -> Self {
        Self {
            kind: ErrorKind::Minic(err),
        }
    }
}

impl From<minic::asm::LoadError> for AppError {
    fn from(err: minic::asm::LoadError) -> Self {
        MinicError::from(err).into()
    }
}

impl From<minic::compile::CodegenError> for AppError {
    fn from(err: minic::compile::CodegenError) -> Self {
        MinicError::from(err).into()
    }
}

impl From<std::fmt::Error> for AppError {
    fn from(err: std::fmt::Error) -> Self {
        MinicError::from(err).into()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self {
            kind: ErrorKind::Io(err),
        }
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        Self {
            kind: ErrorKind::Config(err),
        }
    }
}
