use crate::vex_discovery::domain::{VexDocument, VexValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is some other kind of attestation.
    #[error("payload is not a VEX attestation: {reason}")]
    Foreign { reason: String },

    #[error("payload does not match the OpenVEX schema: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload encoding is invalid: {reason}")]
    Encoding { reason: String },

    #[error("VEX document is invalid: {0}")]
    Invalid(#[from] VexValidationError),
}

impl DecodeError {
    /// True when the payload was recognised as something other than a
    /// VEX document, as opposed to a VEX document that failed to decode.
    pub fn is_foreign(&self) -> bool {
        matches!(self, DecodeError::Foreign { .. })
    }
}

/// DocumentDecoder port for turning attestation payloads into VEX documents
pub trait DocumentDecoder: Send + Sync {
    /// Decodes and validates one raw attestation payload
    ///
    /// # Errors
    /// Returns `DecodeError::Foreign` for payloads of another type, and the
    /// remaining variants for VEX payloads that are malformed or invalid.
    fn decode(&self, payload: &[u8]) -> Result<VexDocument, DecodeError>;
}
