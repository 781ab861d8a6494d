use thiserror::Error;

/// Errors produced while driving the browser, the input backends, or the model endpoint
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Failed to parse page structure: {0}")]
    DomParseFailed(String),

    #[error("Script evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Tool '{tool}' failed: {reason}")]
    ToolExecutionFailed { tool: String, reason: String },

    #[error("Control channel error: {0}")]
    ChannelFailed(String),

    #[error("{backend} input failed: {reason}")]
    InputFailed { backend: String, reason: String },

    #[error("Screenshot failed: {0}")]
    ScreenshotFailed(String),

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    #[error("No valid selector for {0}")]
    NoSelector(String),
}

impl BrowserError {
    pub(crate) fn input(backend: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        BrowserError::InputFailed { backend: backend.into(), reason: reason.to_string() }
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, BrowserError>;
