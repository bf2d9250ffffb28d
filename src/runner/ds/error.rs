use thiserror::Error;

/// Exceptions raised inside the value model. A function or filter returning
/// one of these is the equivalent of a JavaScript `throw`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JErrorType {
    #[error("Uncaught reference error: {0}.")]
    ReferenceError(String),
    #[error("Uncaught type error: {0}.")]
    TypeError(String),
    #[error("Uncaught range error: {0}.")]
    RangeError(String),
    #[error("Uncaught error: {0}.")]
    Error(String),
}

/// Errors surfaced by crate operations that opt into failing loudly.
#[derive(Debug, Error)]
pub enum ShimError {
    #[error("Module search failed!")]
    ModuleSearchFailed,

    #[error("[WebpackModules] Module with id \"{0}\" not found.")]
    ModuleNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid registry snapshot: {0}")]
    Snapshot(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Js(#[from] JErrorType),
}
