use crate::application::dto::Options;
use crate::shared::error::DiscoveryError;
use crate::vex_discovery::domain::{PackageUrl, VexDocument};
use async_trait::async_trait;

/// Prober port - scheme-specific strategy that discovers VEX documents
///
/// One prober serves one package URL type. Probers are registered with the
/// discovery agent under that type and must be safe to share between
/// concurrent probes.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Finds the VEX documents reachable from `purl`
    ///
    /// # Returns
    /// The decoded documents; an empty vector when none are attached.
    ///
    /// # Errors
    /// Returns an error naming the step that failed.
    async fn find_documents_from_purl(
        &self,
        options: &Options,
        purl: &PackageUrl,
    ) -> Result<Vec<VexDocument>, DiscoveryError>;
}
