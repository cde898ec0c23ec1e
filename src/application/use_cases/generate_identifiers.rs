use crate::application::dto::Options;
use crate::ports::outbound::{RegistryClient, RegistryError};
use crate::shared::error::DiscoveryError;
use crate::vex_discovery::domain::{IdentifiersBundle, ImageReference, Platform};
use crate::vex_discovery::services::ReferenceConverter;
use tracing::info;

/// GenerateIdentifiersUseCase - lists the identifiers a container image can
/// be discovered under
///
/// Resolves the reference against its registry, then expands the resolved
/// digest (and the matching platform child of an index) into package URLs
/// and hashes.
///
/// # Type Parameters
/// * `C` - RegistryClient implementation
pub struct GenerateIdentifiersUseCase<C: RegistryClient> {
    client: C,
}

impl<C: RegistryClient> GenerateIdentifiersUseCase<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Resolves `reference` and returns its identifiers for `platform`
    pub async fn execute(
        &self,
        options: &Options,
        reference: &str,
        platform: &Platform,
    ) -> Result<IdentifiersBundle, DiscoveryError> {
        let resolution_error = |source: RegistryError| DiscoveryError::ReferenceResolution {
            reference: reference.to_string(),
            source,
        };

        let parsed: ImageReference = reference.parse().map_err(|e| {
            resolution_error(RegistryError::InvalidReference {
                reference: reference.to_string(),
                reason: format!("{}", e),
            })
        })?;

        let entity = options
            .guard(self.client.resolve(&parsed))
            .await
            .map_err(resolution_error)?;

        let bundle = ReferenceConverter::reference_to_identifiers(&entity, platform);
        info!(
            reference = %entity.reference,
            platform = %platform,
            identifiers = bundle.identifiers.values().map(Vec::len).sum::<usize>(),
            "generated identifiers"
        );

        Ok(bundle)
    }
}
