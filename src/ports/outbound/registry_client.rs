use crate::vex_discovery::domain::{ImageReference, SignedEntity};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a registry client
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid reference \"{reference}\": {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("{reference} not found")]
    NotFound { reference: String },

    #[error("access to {reference} was denied")]
    Unauthorized { reference: String },

    #[error("registry returned status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("registry request failed: {source}")]
    Transport {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("invalid manifest: {reason}")]
    InvalidManifest { reason: String },

    #[error("content of {reference} exceeds {limit} bytes")]
    TooLarge { reference: String, limit: usize },

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("operation was cancelled")]
    Cancelled,

    #[error("operation timed out after {after:?}")]
    TimedOut { after: Duration },
}

/// RegistryClient port for talking to an OCI registry
///
/// This port abstracts the registry wire protocol: turning a reference into
/// a resolved, digest-pinned entity and listing the raw attestation payloads
/// attached to it.
///
/// # Async Support
/// Implementations must be `Send + Sync` so a single client can serve
/// concurrent probes.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Resolves a tag or digest reference to the entity it addresses
    ///
    /// # Errors
    /// Returns an error if:
    /// - The registry cannot be reached
    /// - Access is denied
    /// - The reference does not exist (`RegistryError::NotFound`)
    /// - The manifest cannot be parsed or fails digest verification
    async fn resolve(&self, reference: &ImageReference) -> Result<SignedEntity, RegistryError>;

    /// Fetches the raw payload of every attestation attached to `entity`
    ///
    /// An entity without attestations yields an empty vector.
    ///
    /// # Errors
    /// Returns an error if the attestations exist but cannot be enumerated
    /// or downloaded.
    async fn fetch_attestations(&self, entity: &SignedEntity)
        -> Result<Vec<Vec<u8>>, RegistryError>;
}
