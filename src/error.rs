//! Secure File Vault - Error Types

use thiserror::Error;

/// Result type for vault core operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Vault core error types
#[derive(Error, Debug)]
pub enum VaultError {
    // ═══════════════════════════════════════════════════════════════
    // INGESTION ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Storage permission denied")]
    PermissionDenied,

    #[error("User cancelled the file picker")]
    UserCancelled,

    #[error("File picker failed: {0}")]
    PickerFailure(String),

    // ═══════════════════════════════════════════════════════════════
    // PREVIEW ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Preview decode failed: {0}")]
    DecodeFailure(String),

    // ═══════════════════════════════════════════════════════════════
    // BIOMETRIC ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Biometric sensor unavailable or not enrolled")]
    SensorUnavailable,

    #[error("Biometric authentication failed")]
    AuthFailed,

    // ═══════════════════════════════════════════════════════════════
    // STORAGE / SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl VaultError {
    /// Expected, reportable outcomes that are part of normal user flows.
    /// These degrade to a visible state instead of aborting the flow.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            VaultError::PermissionDenied
                | VaultError::UserCancelled
                | VaultError::SensorUnavailable
                | VaultError::AuthFailed
        )
    }

    /// Human-readable caption for terminal states. Never blank - an
    /// unreadable file becomes a visible message, not a silent failure.
    pub fn caption(&self) -> String {
        match self {
            VaultError::PermissionDenied => "Storage access was denied".into(),
            VaultError::UserCancelled => "Selection cancelled".into(),
            VaultError::PickerFailure(r) => format!("Could not open file picker: {r}"),
            VaultError::DecodeFailure(_) => "No preview available".into(),
            VaultError::SensorUnavailable => "Biometrics not set up on this device".into(),
            VaultError::AuthFailed => "Authentication failed".into(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(e: serde_json::Error) -> Self {
        VaultError::SerializationError(e.to_string())
    }
}
