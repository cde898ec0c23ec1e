use super::HashAlgorithm;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Registry used when a reference does not name one.
pub const DEFAULT_REGISTRY: &str = "index.docker.io";

/// Tag used when a reference names neither a tag nor a digest.
pub const DEFAULT_TAG: &str = "latest";

const MAX_TAG_LENGTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("reference is empty")]
    Empty,

    #[error("invalid registry \"{0}\"")]
    InvalidRegistry(String),

    #[error("invalid repository \"{0}\"")]
    InvalidRepository(String),

    #[error("invalid tag \"{0}\"")]
    InvalidTag(String),

    #[error("invalid digest \"{0}\"")]
    InvalidDigest(String),
}

/// Content digest in `algorithm:hex` form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: String,
    hex: String,
}

impl Digest {
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Maps the OCI algorithm name to the VEX hash algorithm vocabulary.
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        match self.algorithm.as_str() {
            "sha384" => HashAlgorithm::Sha384,
            "sha512" => HashAlgorithm::Sha512,
            _ => HashAlgorithm::Sha256,
        }
    }
}

impl FromStr for Digest {
    type Err = ReferenceError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || ReferenceError::InvalidDigest(input.to_string());
        let (algorithm, hex) = input.split_once(':').ok_or_else(invalid)?;

        let expected_length = match algorithm {
            "sha256" => 64,
            "sha384" => 96,
            "sha512" => 128,
            _ => return Err(invalid()),
        };

        let is_lower_hex = hex
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if hex.len() != expected_length || !is_lower_hex {
            return Err(invalid());
        }

        Ok(Self {
            algorithm: algorithm.to_string(),
            hex: hex.to_string(),
        })
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

/// Tag or digest addressing an element of a repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReferenceTarget {
    Tag(String),
    Digest(Digest),
}

/// A fully qualified image reference
///
/// Parsing normalises Docker Hub shorthands, so `alpine` becomes
/// `index.docker.io/library/alpine:latest`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    registry: String,
    repository: String,
    target: ReferenceTarget,
}

impl ImageReference {
    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn target(&self) -> &ReferenceTarget {
        &self.target
    }

    pub fn digest(&self) -> Option<&Digest> {
        match &self.target {
            ReferenceTarget::Digest(digest) => Some(digest),
            ReferenceTarget::Tag(_) => None,
        }
    }

    /// Last path component of the repository, e.g. `alpine`.
    pub fn name(&self) -> &str {
        self.repository
            .rsplit_once('/')
            .map_or(self.repository.as_str(), |(_, name)| name)
    }

    /// Registry plus the repository path without its last component,
    /// e.g. `index.docker.io/library`. This is the `repository_url`
    /// qualifier value of an OCI package URL.
    pub fn repository_url(&self) -> String {
        match self.repository.rsplit_once('/') {
            Some((parent, _)) => format!("{}/{}", self.registry, parent),
            None => self.registry.clone(),
        }
    }

    /// `registry/repository` without tag or digest.
    pub fn context(&self) -> String {
        format!("{}/{}", self.registry, self.repository)
    }

    pub fn with_digest(&self, digest: Digest) -> Self {
        Self {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
            target: ReferenceTarget::Digest(digest),
        }
    }

    pub fn with_tag(&self, tag: &str) -> Result<Self, ReferenceError> {
        validate_tag(tag)?;
        Ok(Self {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
            target: ReferenceTarget::Tag(tag.to_string()),
        })
    }

    /// Registries on the loopback interface are spoken to over plain HTTP.
    pub fn is_insecure(&self) -> bool {
        let host = self
            .registry
            .rsplit_once(':')
            .map_or(self.registry.as_str(), |(host, _)| host);
        matches!(host, "localhost" | "127.0.0.1" | "[::1]") || host.ends_with(".local")
    }
}

impl FromStr for ImageReference {
    type Err = ReferenceError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.is_empty() {
            return Err(ReferenceError::Empty);
        }

        let (name, digest) = match input.split_once('@') {
            Some((name, digest)) => (name, Some(digest.parse::<Digest>()?)),
            None => (input, None),
        };

        let last_slash = name.rfind('/').map_or(0, |index| index + 1);
        let (name, tag) = match name[last_slash..].rfind(':') {
            Some(colon) => {
                let colon = last_slash + colon;
                (&name[..colon], Some(&name[colon + 1..]))
            }
            None => (name, None),
        };

        let (registry, repository) = split_registry(name);
        validate_registry(&registry)?;

        let repository = if registry == DEFAULT_REGISTRY && !repository.contains('/') {
            format!("library/{}", repository)
        } else {
            repository.to_string()
        };
        validate_repository(&repository)?;

        let target = match (digest, tag) {
            (Some(digest), _) => ReferenceTarget::Digest(digest),
            (None, Some(tag)) => {
                validate_tag(tag)?;
                ReferenceTarget::Tag(tag.to_string())
            }
            (None, None) => ReferenceTarget::Tag(DEFAULT_TAG.to_string()),
        };

        Ok(Self {
            registry,
            repository,
            target,
        })
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            ReferenceTarget::Tag(tag) => write!(f, "{}/{}:{}", self.registry, self.repository, tag),
            ReferenceTarget::Digest(digest) => {
                write!(f, "{}/{}@{}", self.registry, self.repository, digest)
            }
        }
    }
}

fn split_registry(name: &str) -> (String, &str) {
    match name.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            let registry = if first == "docker.io" {
                DEFAULT_REGISTRY
            } else {
                first
            };
            (registry.to_string(), rest)
        }
        _ => (DEFAULT_REGISTRY.to_string(), name),
    }
}

fn validate_registry(registry: &str) -> Result<(), ReferenceError> {
    let valid = !registry.is_empty()
        && registry
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'));

    if !valid {
        return Err(ReferenceError::InvalidRegistry(registry.to_string()));
    }
    Ok(())
}

fn validate_repository(repository: &str) -> Result<(), ReferenceError> {
    let valid = !repository.is_empty()
        && repository.split('/').all(|component| !component.is_empty())
        && repository.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.' | '/')
        });

    if !valid {
        return Err(ReferenceError::InvalidRepository(repository.to_string()));
    }
    Ok(())
}

fn validate_tag(tag: &str) -> Result<(), ReferenceError> {
    let valid = !tag.is_empty()
        && tag.len() <= MAX_TAG_LENGTH
        && !tag.starts_with(['.', '-'])
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));

    if !valid {
        return Err(ReferenceError::InvalidTag(tag.to_string()));
    }
    Ok(())
}
