use super::{Digest, ImageReference};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating system / architecture pair an image is built for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub architecture: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl Platform {
    pub fn new(os: &str, architecture: &str) -> Self {
        Self {
            os: os.to_string(),
            architecture: architecture.to_string(),
            variant: None,
        }
    }

    /// True when `candidate` satisfies this platform used as a filter.
    /// The variant only takes part in the match when the filter names one.
    pub fn matches(&self, candidate: &Platform) -> bool {
        self.os == candidate.os
            && self.architecture == candidate.architecture
            && self
                .variant
                .as_ref()
                .is_none_or(|variant| candidate.variant.as_ref() == Some(variant))
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::new("linux", "amd64")
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [os, arch] if !os.is_empty() && !arch.is_empty() => Ok(Self::new(os, arch)),
            [os, arch, variant] if !os.is_empty() && !arch.is_empty() && !variant.is_empty() => {
                Ok(Self {
                    variant: Some(variant.to_string()),
                    ..Self::new(os, arch)
                })
            }
            _ => Err(format!(
                "Invalid platform: {}. Expected os/arch or os/arch/variant (e.g. linux/amd64)",
                s
            )),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)?;
        if let Some(variant) = &self.variant {
            write!(f, "/{}", variant)?;
        }
        Ok(())
    }
}

/// A child manifest listed by an image index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformManifest {
    pub digest: Digest,
    pub media_type: String,
    pub platform: Option<Platform>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    Image,
    Index { manifests: Vec<PlatformManifest> },
}

/// SignedEntity - an image or index resolved from a registry
///
/// `reference` is pinned to `digest`, so every follow-up request
/// (attestations, children) addresses exactly the resolved content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEntity {
    pub reference: ImageReference,
    pub digest: Digest,
    pub media_type: String,
    pub kind: EntityKind,
}

impl SignedEntity {
    pub fn image(reference: &ImageReference, digest: Digest, media_type: &str) -> Self {
        Self {
            reference: reference.with_digest(digest.clone()),
            digest,
            media_type: media_type.to_string(),
            kind: EntityKind::Image,
        }
    }

    pub fn index(
        reference: &ImageReference,
        digest: Digest,
        media_type: &str,
        manifests: Vec<PlatformManifest>,
    ) -> Self {
        Self {
            reference: reference.with_digest(digest.clone()),
            digest,
            media_type: media_type.to_string(),
            kind: EntityKind::Index { manifests },
        }
    }

    /// Child manifest matching `platform`, if this entity is an index.
    pub fn manifest_for(&self, platform: &Platform) -> Option<&PlatformManifest> {
        match &self.kind {
            EntityKind::Index { manifests } => manifests.iter().find(|manifest| {
                manifest
                    .platform
                    .as_ref()
                    .is_some_and(|candidate| platform.matches(candidate))
            }),
            EntityKind::Image => None,
        }
    }
}
