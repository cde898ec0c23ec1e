use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kinds of identifiers a component can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IdentifierType {
    #[serde(rename = "purl")]
    Purl,
    #[serde(rename = "cpe22")]
    Cpe22,
    #[serde(rename = "cpe23")]
    Cpe23,
}

impl fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IdentifierType::Purl => "purl",
            IdentifierType::Cpe22 => "cpe22",
            IdentifierType::Cpe23 => "cpe23",
        };
        write!(f, "{}", label)
    }
}

/// Hash algorithms, named the way OpenVEX documents name them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[serde(rename = "md5")]
    Md5,
    #[serde(rename = "sha1")]
    Sha1,
    #[serde(rename = "sha-256")]
    Sha256,
    #[serde(rename = "sha-384")]
    Sha384,
    #[serde(rename = "sha-512")]
    Sha512,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha-256",
            HashAlgorithm::Sha384 => "sha-384",
            HashAlgorithm::Sha512 => "sha-512",
        };
        write!(f, "{}", label)
    }
}

/// Component - a described software artifact
///
/// The same shape is used for the products and subcomponents of VEX
/// statements, so the field names follow the OpenVEX JSON form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub identifiers: BTreeMap<IdentifierType, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hashes: BTreeMap<HashAlgorithm, String>,
}

impl Component {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for a component identified only by a purl.
    pub fn from_purl(purl: &str) -> Self {
        Self::new().with_identifier(IdentifierType::Purl, purl)
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_identifier(mut self, kind: IdentifierType, value: &str) -> Self {
        self.identifiers.insert(kind, value.to_string());
        self
    }

    pub fn with_hash(mut self, algorithm: HashAlgorithm, value: &str) -> Self {
        self.hashes.insert(algorithm, value.to_string());
        self
    }

    pub fn identifier(&self, kind: IdentifierType) -> Option<&str> {
        self.identifiers.get(&kind).map(String::as_str)
    }

    pub fn purl(&self) -> Option<&str> {
        self.identifier(IdentifierType::Purl)
    }
}
