use thiserror::Error;

/// Errors the engine reports to its caller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A style id that is not in the library
    #[error("unknown style '{0}'")]
    UnknownStyle(String),

    /// A library whose records do not fit together
    #[error("invalid library: {0}")]
    InvalidLibrary(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
