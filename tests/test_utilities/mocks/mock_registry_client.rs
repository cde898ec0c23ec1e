use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vex_discovery::prelude::{ImageReference, RegistryClient, RegistryError, SignedEntity};
use vex_discovery::vex_discovery::domain::PlatformManifest;

const OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
const OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";

/// Mock RegistryClient serving in-memory images and attestations
///
/// Clones share the log of resolved references.
#[derive(Clone)]
pub struct MockRegistryClient {
    entities: HashMap<String, SignedEntity>,
    attestations: HashMap<String, Vec<Vec<u8>>>,
    fetch_status: Option<u16>,
    delay: Option<Duration>,
    resolved: Arc<Mutex<Vec<String>>>,
}

impl MockRegistryClient {
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            attestations: HashMap::new(),
            fetch_status: None,
            delay: None,
            resolved: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Serves a single-platform image under `reference`.
    pub fn with_image(mut self, reference: &str, digest: &str) -> Self {
        let parsed: ImageReference = reference.parse().unwrap();
        let entity = SignedEntity::image(&parsed, digest.parse().unwrap(), OCI_MANIFEST);
        self.entities.insert(parsed.to_string(), entity);
        self
    }

    /// Serves an index under `reference`; children are `(platform, digest)` pairs.
    pub fn with_index(mut self, reference: &str, digest: &str, children: &[(&str, &str)]) -> Self {
        let parsed: ImageReference = reference.parse().unwrap();
        let manifests = children
            .iter()
            .map(|(platform, child)| PlatformManifest {
                digest: child.parse().unwrap(),
                media_type: OCI_MANIFEST.to_string(),
                platform: Some(platform.parse().unwrap()),
            })
            .collect();
        let entity = SignedEntity::index(&parsed, digest.parse().unwrap(), OCI_INDEX, manifests);
        self.entities.insert(parsed.to_string(), entity);
        self
    }

    /// Attaches raw attestation payloads to the entity with `digest`.
    pub fn with_attestations(mut self, digest: &str, payloads: Vec<Vec<u8>>) -> Self {
        self.attestations.insert(digest.to_string(), payloads);
        self
    }

    pub fn with_fetch_failure(mut self, status: u16) -> Self {
        self.fetch_status = Some(status);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// References passed to `resolve`, normalised.
    pub fn resolved_references(&self) -> Vec<String> {
        self.resolved.lock().unwrap().clone()
    }

    async fn wait(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for MockRegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistryClient for MockRegistryClient {
    async fn resolve(&self, reference: &ImageReference) -> Result<SignedEntity, RegistryError> {
        self.resolved.lock().unwrap().push(reference.to_string());
        self.wait().await;

        self.entities
            .get(&reference.to_string())
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                reference: reference.to_string(),
            })
    }

    async fn fetch_attestations(
        &self,
        entity: &SignedEntity,
    ) -> Result<Vec<Vec<u8>>, RegistryError> {
        self.wait().await;

        if let Some(status) = self.fetch_status {
            return Err(RegistryError::Status {
                url: format!("https://{}/v2/", entity.reference.registry()),
                status,
            });
        }

        Ok(self
            .attestations
            .get(&entity.digest.to_string())
            .cloned()
            .unwrap_or_default())
    }
}
