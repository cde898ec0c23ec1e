/// OCI prober - discovers VEX attestations attached to container images
mod downloader;
mod resolver;

pub use downloader::{DocumentDownloader, RegistryDocumentDownloader};
pub use resolver::{OciReferenceResolver, ReferenceResolver};

use crate::adapters::outbound::decoders::OpenVexDecoder;
use crate::adapters::outbound::network::OciRegistryClient;
use crate::application::dto::Options;
use crate::ports::outbound::Prober;
use crate::shared::error::{DiscoveryError, ProbeStep};
use crate::shared::Result;
use crate::vex_discovery::domain::{PackageUrl, VexDocument};
use async_trait::async_trait;
use tracing::debug;

/// Downloader wired to the real registry and OpenVEX decoder.
pub type DefaultDownloader = RegistryDocumentDownloader<OciRegistryClient, OpenVexDecoder>;

/// OciProber - finds VEX documents for `pkg:oci` package URLs
///
/// The prober holds no mutable state; the resolver and downloader are
/// injected so either can be replaced in tests.
///
/// # Type Parameters
/// * `R` - ReferenceResolver implementation
/// * `D` - DocumentDownloader implementation
pub struct OciProber<R = OciReferenceResolver, D = DefaultDownloader> {
    resolver: R,
    downloader: D,
}

impl OciProber {
    /// Creates a prober that talks to real registries
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let downloader =
            RegistryDocumentDownloader::new(OciRegistryClient::new()?, OpenVexDecoder::new());
        Ok(Self::with_components(OciReferenceResolver, downloader))
    }
}

impl<R, D> OciProber<R, D>
where
    R: ReferenceResolver,
    D: DocumentDownloader,
{
    pub fn with_components(resolver: R, downloader: D) -> Self {
        Self {
            resolver,
            downloader,
        }
    }
}

#[async_trait]
impl<R, D> Prober for OciProber<R, D>
where
    R: ReferenceResolver,
    D: DocumentDownloader,
{
    async fn find_documents_from_purl(
        &self,
        options: &Options,
        purl: &PackageUrl,
    ) -> std::result::Result<Vec<VexDocument>, DiscoveryError> {
        let oci_options = options.oci_options();

        let reference = self
            .resolver
            .purl_to_reference(&oci_options, purl)
            .map_err(|e| e.in_step(ProbeStep::ConvertReference))?;
        debug!(purl = %purl, reference = %reference, "converted purl to reference");

        let entity = self
            .downloader
            .resolve_image_reference(options, &reference)
            .await
            .map_err(|e| e.in_step(ProbeStep::ResolveReference))?;

        let documents = self
            .downloader
            .download_documents(options, &entity)
            .await
            .map_err(|e| e.in_step(ProbeStep::DownloadDocuments))?;

        Ok(documents)
    }
}
