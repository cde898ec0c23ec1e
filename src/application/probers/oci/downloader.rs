use crate::application::dto::Options;
use crate::ports::outbound::{DocumentDecoder, RegistryClient, RegistryError};
use crate::shared::error::DiscoveryError;
use crate::vex_discovery::domain::{ImageReference, ReferenceError, SignedEntity, VexDocument};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// DocumentDownloader - the network-facing half of the OCI prober
#[async_trait]
pub trait DocumentDownloader: Send + Sync {
    /// Resolves a tag or digest reference to a queryable entity.
    async fn resolve_image_reference(
        &self,
        options: &Options,
        reference: &str,
    ) -> Result<SignedEntity, DiscoveryError>;

    /// Fetches and decodes the VEX attestations attached to `entity`.
    async fn download_documents(
        &self,
        options: &Options,
        entity: &SignedEntity,
    ) -> Result<Vec<VexDocument>, DiscoveryError>;
}

/// RegistryDocumentDownloader - downloads attestations through a
/// [`RegistryClient`] and decodes them with a [`DocumentDecoder`]
///
/// # Type Parameters
/// * `C` - RegistryClient implementation
/// * `X` - DocumentDecoder implementation
pub struct RegistryDocumentDownloader<C, X> {
    client: C,
    decoder: X,
}

impl<C, X> RegistryDocumentDownloader<C, X>
where
    C: RegistryClient,
    X: DocumentDecoder,
{
    pub fn new(client: C, decoder: X) -> Self {
        Self { client, decoder }
    }

    fn decode_payloads(&self, entity: &SignedEntity, payloads: &[Vec<u8>]) -> Vec<VexDocument> {
        let mut documents = Vec::new();

        for (index, payload) in payloads.iter().enumerate() {
            match self.decoder.decode(payload) {
                Ok(document) => documents.push(document),
                Err(e) if e.is_foreign() => {
                    debug!(reference = %entity.reference, index, reason = %e, "skipping attestation");
                }
                Err(e) => {
                    warn!(reference = %entity.reference, index, error = %e, "skipping undecodable VEX attestation");
                }
            }
        }

        documents
    }
}

#[async_trait]
impl<C, X> DocumentDownloader for RegistryDocumentDownloader<C, X>
where
    C: RegistryClient,
    X: DocumentDecoder,
{
    async fn resolve_image_reference(
        &self,
        options: &Options,
        reference: &str,
    ) -> Result<SignedEntity, DiscoveryError> {
        let resolution_error = |source: RegistryError| DiscoveryError::ReferenceResolution {
            reference: reference.to_string(),
            source,
        };

        let parsed: ImageReference = reference.parse().map_err(|e: ReferenceError| {
            resolution_error(RegistryError::InvalidReference {
                reference: reference.to_string(),
                reason: e.to_string(),
            })
        })?;

        let entity = options
            .guard(self.client.resolve(&parsed))
            .await
            .map_err(resolution_error)?;

        debug!(reference, digest = %entity.digest, "resolved image reference");
        Ok(entity)
    }

    async fn download_documents(
        &self,
        options: &Options,
        entity: &SignedEntity,
    ) -> Result<Vec<VexDocument>, DiscoveryError> {
        let payloads = options
            .guard(self.client.fetch_attestations(entity))
            .await
            .map_err(|source| DiscoveryError::Fetch {
                reference: entity.reference.to_string(),
                source,
            })?;

        let documents = self.decode_payloads(entity, &payloads);
        info!(
            reference = %entity.reference,
            attestations = payloads.len(),
            documents = documents.len(),
            "downloaded VEX documents"
        );

        Ok(documents)
    }
}
