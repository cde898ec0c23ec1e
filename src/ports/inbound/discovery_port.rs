use crate::shared::error::DiscoveryError;
use crate::vex_discovery::domain::{Component, VexDocument};
use async_trait::async_trait;

/// DiscoveryPort - Inbound port for VEX document discovery
///
/// This port defines the interface that external adapters (CLI, services
/// embedding the library) use to look up VEX documents for components.
#[async_trait]
pub trait DiscoveryPort: Send + Sync {
    /// Examines a component and retrieves every VEX document found at the
    /// locations implied by its package URL
    ///
    /// # Errors
    /// Returns an error if:
    /// - The component carries no package URL
    /// - The package URL is malformed
    /// - No prober is registered for its type
    /// - The prober fails
    async fn probe_component(
        &self,
        component: &Component,
    ) -> Result<Vec<VexDocument>, DiscoveryError>;

    /// Probes a component identified only by `purl`
    async fn probe_purl(&self, purl: &str) -> Result<Vec<VexDocument>, DiscoveryError> {
        self.probe_component(&Component::from_purl(purl)).await
    }

    /// Probes each component independently, one result per component
    ///
    /// A failure for one component does not stop the remaining probes.
    async fn probe_components(
        &self,
        components: &[Component],
    ) -> Vec<Result<Vec<VexDocument>, DiscoveryError>> {
        let mut results = Vec::with_capacity(components.len());
        for component in components {
            results.push(self.probe_component(component).await);
        }
        results
    }
}
