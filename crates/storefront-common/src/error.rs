/// Errors raised by a browser driver.
#[derive(thiserror::Error, Debug, Clone)]
pub enum DriverError {
    // ============================================================
    // Navigation Errors
    // ============================================================
    #[error("Navigation failed: {0}")]
    Navigation(String),

    // ============================================================
    // Element Errors
    // ============================================================
    #[error("Element {index} of '{selector}' not found")]
    ElementNotFound { selector: String, index: usize },

    #[error("Invalid selector: {selector}")]
    SelectorInvalid { selector: String },

    // ============================================================
    // Execution Errors
    // ============================================================
    #[error("Script execution error: {0}")]
    ScriptError(String),

    #[error("Timeout: {operation}")]
    TimeoutWithContext { operation: String },

    // ============================================================
    // System Errors
    // ============================================================
    #[error("Connection lost")]
    ConnectionLost,

    #[error("Not ready")]
    NotReady,

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Other: {0}")]
    Other(String),

    #[error("Not supported: {0}")]
    NotSupported(String),
}

impl From<std::io::Error> for DriverError {
    fn from(err: std::io::Error) -> Self {
        DriverError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        DriverError::Serialization(err.to_string())
    }
}

impl DriverError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            DriverError::Navigation(_) => "NAVIGATION_ERROR",
            DriverError::ElementNotFound { .. } => "ELEMENT_NOT_FOUND",
            DriverError::SelectorInvalid { .. } => "SELECTOR_INVALID",
            DriverError::ScriptError(_) => "SCRIPT_ERROR",
            DriverError::TimeoutWithContext { .. } => "TIMEOUT",
            DriverError::ConnectionLost => "CONNECTION_LOST",
            DriverError::NotReady => "NOT_READY",
            DriverError::Io(_) => "IO_ERROR",
            DriverError::Serialization(_) => "SERIALIZATION_ERROR",
            DriverError::Other(_) => "INTERNAL_ERROR",
            DriverError::NotSupported(_) => "NOT_SUPPORTED",
        }
    }

    /// True when the browser or page itself is unusable. Retrying another
    /// category cannot help, so these escape a bounded search.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::NotReady | DriverError::ConnectionLost)
    }

    /// Suggested follow-up for the operator.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            DriverError::ElementNotFound { .. } => "Re-query the page; the listing may have changed",
            DriverError::TimeoutWithContext { .. } => {
                "Increase timeouts.load_ms or check storefront latency"
            }
            DriverError::SelectorInvalid { .. } => "Fix the selector in the selectors config",
            DriverError::Navigation(_) => "Check URL and network connectivity",
            DriverError::NotReady | DriverError::ConnectionLost => "Relaunch the browser",
            _ => "Check driver logs",
        }
    }
}
