use std::fmt;

/// The closed error-kind enumeration from spec.md §7. Every failure the
/// runtime surfaces to an embedder names one of these; new variants are
/// a breaking change, the same way the teacher treats `wasmtime::Trap`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    NotInitialized,
    TypeMismatch,
    Registration,
    LoadFailed,
    ParseFailed,
    Trap,
    Cancelled,
    DeadlineExceeded,
    AbiLift,
    AbiLower,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidInput => "invalid-input",
            ErrorKind::NotFound => "not-found",
            ErrorKind::NotInitialized => "not-initialized",
            ErrorKind::TypeMismatch => "type-mismatch",
            ErrorKind::Registration => "registration",
            ErrorKind::LoadFailed => "load-failed",
            ErrorKind::ParseFailed => "parse-failed",
            ErrorKind::Trap => "trap",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::DeadlineExceeded => "deadline-exceeded",
            ErrorKind::AbiLift => "abi-lift",
            ErrorKind::AbiLower => "abi-lower",
        };
        f.write_str(s)
    }
}

/// Where in the pipeline an error arose (spec.md §7 "Phases").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Runtime,
    Host,
    Load,
    Parse,
    Lift,
    Lower,
    Scheduler,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Runtime => "runtime",
            Phase::Host => "host",
            Phase::Load => "load",
            Phase::Parse => "parse",
            Phase::Lift => "lift",
            Phase::Lower => "lower",
            Phase::Scheduler => "scheduler",
        };
        f.write_str(s)
    }
}

/// A user-visible failure: its kind, the phase it arose in, a short
/// detail string, and — for ABI errors — the function name and the
/// argument/field path that was being converted (spec.md §7).
#[derive(Clone, Debug, thiserror::Error)]
pub struct Error {
    pub kind: ErrorKind,
    pub phase: Phase,
    pub detail: String,
    pub function: Option<String>,
    pub path: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, phase: Phase, detail: impl Into<String>) -> Self {
        Error {
            kind,
            phase,
            detail: detail.into(),
            function: None,
            path: None,
        }
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error in {} phase: {}", self.kind, self.phase, self.detail)?;
        if let Some(function) = &self.function {
            write!(f, " (function `{function}`")?;
            if let Some(path) = &self.path {
                write!(f, ", at `{path}`")?;
            }
            write!(f, ")")?;
        } else if let Some(path) = &self.path {
            write!(f, " (at `{path}`)")?;
        }
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
