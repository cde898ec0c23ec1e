use crate::application::dto::{OciOptions, OCI_SCHEME};
use crate::shared::error::DiscoveryError;
use crate::vex_discovery::domain::{
    Digest, IdentifierType, IdentifiersBundle, ImageReference, PackageUrl, Platform, PurlError,
    SignedEntity,
};

const REPOSITORY_URL_QUALIFIER: &str = "repository_url";
const TAG_QUALIFIER: &str = "tag";
const ARCH_QUALIFIER: &str = "arch";
const OS_QUALIFIER: &str = "os";

/// ReferenceConverter - translates between OCI package URLs and registry references
///
/// Both directions are pure: no registry is contacted here.
pub struct ReferenceConverter;

impl ReferenceConverter {
    /// Converts an OCI package URL into a registry reference string
    ///
    /// The repository prefix is chosen by precedence:
    /// 1. `options.repository_override`
    /// 2. the `repository_url` qualifier
    /// 3. `options.repository`
    /// 4. none (bare name)
    ///
    /// A digest version addresses by digest and any `tag` qualifier is
    /// ignored; any other version is used as the tag.
    ///
    /// # Errors
    /// Returns `UnsupportedScheme` for non-OCI package URLs and
    /// `InvalidIdentifier` when no valid reference can be built.
    pub fn purl_to_reference(
        options: &OciOptions,
        purl: &PackageUrl,
    ) -> Result<String, DiscoveryError> {
        if purl.purl_type() != OCI_SCHEME {
            return Err(DiscoveryError::UnsupportedScheme {
                scheme: purl.purl_type().to_string(),
            });
        }

        let invalid = |reason: String| DiscoveryError::InvalidIdentifier {
            purl: purl.to_string(),
            reason,
        };

        if purl.name().is_empty() {
            return Err(invalid("package url has no name".to_string()));
        }

        let repository = options
            .repository_override
            .as_deref()
            .or_else(|| purl.qualifier(REPOSITORY_URL_QUALIFIER))
            .or(options.repository.as_deref())
            .filter(|repository| !repository.is_empty());

        let mut reference = String::new();
        if let Some(repository) = repository {
            reference.push_str(repository);
            if !repository.ends_with('/') {
                reference.push('/');
            }
        }
        reference.push_str(purl.name());

        match purl.version() {
            Some(version) if version.contains(':') => {
                let digest: Digest = version
                    .parse()
                    .map_err(|e| invalid(format!("malformed digest version: {}", e)))?;
                reference.push('@');
                reference.push_str(&digest.to_string());
            }
            Some(tag) => {
                reference.push(':');
                reference.push_str(tag);
            }
            None => {
                if let Some(tag) = purl.qualifier(TAG_QUALIFIER) {
                    reference.push(':');
                    reference.push_str(tag);
                }
            }
        }

        reference
            .parse::<ImageReference>()
            .map_err(|e| invalid(format!("\"{}\" is not a valid image reference: {}", reference, e)))?;

        Ok(reference)
    }

    /// Lists every package URL and hash a resolved image can be discovered under
    ///
    /// For the entity digest, and for the index child matching `platform`
    /// when the entity is an index, this emits one unqualified purl and one
    /// qualified with the platform's `arch` and `os`. All purls carry the
    /// resolved `repository_url`.
    pub fn reference_to_identifiers(entity: &SignedEntity, platform: &Platform) -> IdentifiersBundle {
        let mut bundle = IdentifiersBundle::new();
        let reference = &entity.reference;

        Self::add_digest(&mut bundle, reference, &entity.digest, platform);
        if let Some(child) = entity.manifest_for(platform) {
            Self::add_digest(&mut bundle, reference, &child.digest, platform);
        }

        bundle
    }

    fn add_digest(
        bundle: &mut IdentifiersBundle,
        reference: &ImageReference,
        digest: &Digest,
        platform: &Platform,
    ) {
        for purl in Self::purls_for_digest(reference, digest, platform) {
            bundle.add_identifier(IdentifierType::Purl, purl.to_string());
        }
        bundle.add_hash(digest.hash_algorithm(), digest.hex().to_string());
    }

    fn purls_for_digest(
        reference: &ImageReference,
        digest: &Digest,
        platform: &Platform,
    ) -> Vec<PackageUrl> {
        let build = || -> Result<(PackageUrl, PackageUrl), PurlError> {
            let unqualified = PackageUrl::new(OCI_SCHEME, reference.name())?
                .with_version(&digest.to_string())
                .with_qualifier(REPOSITORY_URL_QUALIFIER, &reference.repository_url())?;
            let qualified = unqualified
                .clone()
                .with_qualifier(ARCH_QUALIFIER, &platform.architecture)?
                .with_qualifier(OS_QUALIFIER, &platform.os)?;
            Ok((unqualified, qualified))
        };

        // Repository names are never empty and the qualifier keys are constants.
        match build() {
            Ok((unqualified, qualified)) => vec![unqualified, qualified],
            Err(e) => {
                tracing::warn!(reference = %reference, error = %e, "cannot build package url");
                Vec::new()
            }
        }
    }
}
