/// Error types for the relay-settle commands
#[derive(Debug, thiserror::Error)]
pub enum SettleError {
    /// Failed to read or write a file
    #[error("Failed to access file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Malformed JSON input
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A signing key that is not a valid secp256k1 scalar
    #[error("Invalid signing key: {0}")]
    InvalidSigningKey(String),

    /// The scenario could not be set up
    #[error("Scenario setup failed: {0}")]
    Setup(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for the relay-settle commands
pub type Result<T> = std::result::Result<T, SettleError>;
