//! Error types for the capture pipeline

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for capture operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing a document
#[derive(Error, Debug)]
pub enum Error {
    /// Source document does not exist
    #[error("HTML file not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// Input directory for a batch run does not exist
    #[error("HTML directory not found: {}", .0.display())]
    MissingInputDir(PathBuf),

    /// Navigation did not reach network quiescence in time
    #[error("Navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    /// Failed to launch or configure the browser
    #[error("Engine initialization failed: {0}")]
    InitializationError(String),

    /// Failed to load a document
    #[error("Failed to load document: {0}")]
    LoadError(String),

    /// Failed to render content
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Failed to execute JavaScript
    #[error("Script execution failed: {0}")]
    ScriptError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
