use crate::application::dto::{Options, OCI_SCHEME};
use crate::application::probers::OciProber;
use crate::ports::inbound::DiscoveryPort;
use crate::ports::outbound::Prober;
use crate::shared::error::{DiscoveryError, ProbeStep};
use crate::shared::Result;
use crate::vex_discovery::domain::{Component, PackageUrl, VexDocument};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info_span, Instrument};

/// ProberRegistry - maps package URL types to the prober that serves them
///
/// The registry may be shared between agents through an `Arc`. Lookups take
/// a read lock and never block each other; a registration briefly takes the
/// write lock. No lock is held while a probe runs.
#[derive(Default)]
pub struct ProberRegistry {
    probers: RwLock<HashMap<String, Arc<dyn Prober>>>,
}

impl ProberRegistry {
    /// Creates a registry with no probers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in OCI prober.
    pub fn with_defaults() -> Result<Self> {
        let registry = Self::new();
        registry.register(OCI_SCHEME, Arc::new(OciProber::new()?));
        Ok(registry)
    }

    /// Registers `prober` for `scheme`, replacing any previous one.
    pub fn register(&self, scheme: &str, prober: Arc<dyn Prober>) {
        let mut probers = self.probers.write().unwrap_or_else(PoisonError::into_inner);
        probers.insert(scheme.to_lowercase(), prober);
    }

    pub fn get(&self, scheme: &str) -> Option<Arc<dyn Prober>> {
        let probers = self.probers.read().unwrap_or_else(PoisonError::into_inner);
        probers.get(scheme).cloned()
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<String> {
        let probers = self.probers.read().unwrap_or_else(PoisonError::into_inner);
        let mut schemes: Vec<String> = probers.keys().cloned().collect();
        schemes.sort();
        schemes
    }
}

/// DiscoveryAgent - inspects components and dispatches them to probers
///
/// The agent owns its options and shares the prober registry. It can be
/// used concurrently from many tasks.
pub struct DiscoveryAgent {
    registry: Arc<ProberRegistry>,
    options: Options,
}

impl DiscoveryAgent {
    /// Creates an agent with the built-in probers and default options
    ///
    /// # Errors
    /// Returns an error if a built-in prober cannot be constructed.
    pub fn new() -> Result<Self> {
        Ok(Self::with_registry(
            Arc::new(ProberRegistry::with_defaults()?),
            Options::default(),
        ))
    }

    pub fn with_registry(registry: Arc<ProberRegistry>, options: Options) -> Self {
        Self { registry, options }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn registry(&self) -> &Arc<ProberRegistry> {
        &self.registry
    }

    /// Registers a prober on the shared registry.
    pub fn register_prober(&self, scheme: &str, prober: Arc<dyn Prober>) {
        self.registry.register(scheme, prober);
    }

    async fn probe(&self, purl_string: &str) -> std::result::Result<Vec<VexDocument>, DiscoveryError> {
        let purl: PackageUrl =
            purl_string
                .parse()
                .map_err(|source| DiscoveryError::IdentifierParse {
                    purl: purl_string.to_string(),
                    source,
                })?;

        let prober =
            self.registry
                .get(purl.purl_type())
                .ok_or_else(|| DiscoveryError::UnregisteredProber {
                    scheme: purl.purl_type().to_string(),
                })?;

        let documents = prober
            .find_documents_from_purl(&self.options, &purl)
            .await
            .map_err(|e| e.in_step(ProbeStep::FetchDocuments))?;

        debug!(purl = %purl, documents = documents.len(), "probe finished");
        Ok(documents)
    }
}

#[async_trait]
impl DiscoveryPort for DiscoveryAgent {
    async fn probe_component(
        &self,
        component: &Component,
    ) -> std::result::Result<Vec<VexDocument>, DiscoveryError> {
        let purl = component.purl().ok_or(DiscoveryError::MissingIdentifier)?;

        let span = info_span!(parent: &self.options.span, "probe_component", purl = %purl);
        self.probe(purl).instrument(span).await
    }
}
