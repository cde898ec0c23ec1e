use crate::application::dto::OciOptions;
use crate::shared::error::DiscoveryError;
use crate::vex_discovery::domain::PackageUrl;
use crate::vex_discovery::services::ReferenceConverter;

/// ReferenceResolver - turns an OCI package URL into a registry reference
pub trait ReferenceResolver: Send + Sync {
    fn purl_to_reference(
        &self,
        options: &OciOptions,
        purl: &PackageUrl,
    ) -> Result<String, DiscoveryError>;
}

/// Production resolver backed by [`ReferenceConverter`]
#[derive(Debug, Clone, Copy, Default)]
pub struct OciReferenceResolver;

impl ReferenceResolver for OciReferenceResolver {
    fn purl_to_reference(
        &self,
        options: &OciOptions,
        purl: &PackageUrl,
    ) -> Result<String, DiscoveryError> {
        ReferenceConverter::purl_to_reference(options, purl)
    }
}
