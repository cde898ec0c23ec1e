use super::Component;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

/// Prefix shared by every OpenVEX context and predicate type URI.
pub const OPENVEX_CONTEXT_PREFIX: &str = "https://openvex.dev/ns";

/// OpenVEX document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VexDocument {
    #[serde(rename = "@context")]
    pub context: String,

    #[serde(rename = "@id")]
    pub id: String,

    #[serde(default)]
    pub author: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "deserialize_version")]
    pub version: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooling: Option<String>,

    #[serde(default)]
    pub statements: Vec<Statement>,
}

/// A single exploitability statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub vulnerability: Vulnerability,

    #[serde(default)]
    pub products: Vec<Product>,

    pub status: Status,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<Justification>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_statement: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_statement: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Vulnerability named by a statement
///
/// Legacy `https://openvex.dev/ns` documents give the vulnerability as a bare
/// name string; both forms are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "VulnerabilityRepr")]
pub struct Vulnerability {
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

/// Product a statement applies to
///
/// Legacy documents list products and subcomponents as plain identifier
/// strings; those become components whose `@id` is the string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ProductRepr")]
pub struct Product {
    #[serde(flatten)]
    pub component: Component,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcomponents: Vec<Component>,
}

#[derive(Deserialize)]
struct VulnerabilityFields {
    #[serde(rename = "@id", default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VulnerabilityRepr {
    Name(String),
    Detailed(VulnerabilityFields),
}

impl From<VulnerabilityRepr> for Vulnerability {
    fn from(repr: VulnerabilityRepr) -> Self {
        match repr {
            VulnerabilityRepr::Name(name) => Self {
                id: None,
                name,
                description: None,
                aliases: Vec::new(),
            },
            VulnerabilityRepr::Detailed(fields) => Self {
                id: fields.id,
                name: fields.name,
                description: fields.description,
                aliases: fields.aliases,
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ComponentRepr {
    Id(String),
    Detailed(Component),
}

impl From<ComponentRepr> for Component {
    fn from(repr: ComponentRepr) -> Self {
        match repr {
            ComponentRepr::Id(id) if id.starts_with("pkg:") => {
                Component::from_purl(&id).with_id(&id)
            }
            ComponentRepr::Id(id) => Component::new().with_id(&id),
            ComponentRepr::Detailed(component) => component,
        }
    }
}

#[derive(Deserialize)]
struct ProductFields {
    #[serde(flatten)]
    component: Component,
    #[serde(default)]
    subcomponents: Vec<ComponentRepr>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProductRepr {
    Id(String),
    Detailed(ProductFields),
}

impl From<ProductRepr> for Product {
    fn from(repr: ProductRepr) -> Self {
        match repr {
            ProductRepr::Id(id) => Self {
                component: ComponentRepr::Id(id).into(),
                subcomponents: Vec::new(),
            },
            ProductRepr::Detailed(fields) => Self {
                component: fields.component,
                subcomponents: fields.subcomponents.into_iter().map(Component::from).collect(),
            },
        }
    }
}

/// Accepts the document version as a number or, in legacy documents, a
/// numeric string.
fn deserialize_version<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Version {
        Number(u32),
        Text(String),
    }

    match Version::deserialize(deserializer)? {
        Version::Number(version) => Ok(version),
        Version::Text(text) => text.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("invalid document version \"{}\"", text))
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    NotAffected,
    Affected,
    Fixed,
    UnderInvestigation,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::NotAffected => "not_affected",
            Status::Affected => "affected",
            Status::Fixed => "fixed",
            Status::UnderInvestigation => "under_investigation",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Justification {
    ComponentNotPresent,
    VulnerableCodeNotPresent,
    VulnerableCodeNotInExecutePath,
    VulnerableCodeCannotBeControlledByAdversary,
    InlineMitigationsAlreadyExist,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VexValidationError {
    #[error("unsupported document context \"{0}\"")]
    UnsupportedContext(String),

    #[error("document has no @id")]
    MissingId,

    #[error("statement {index} has no vulnerability name")]
    MissingVulnerability { index: usize },

    #[error("statement {index} is not_affected but has neither justification nor impact statement")]
    MissingJustification { index: usize },

    #[error("statement {index} is affected but has no action statement")]
    MissingActionStatement { index: usize },
}

impl VexDocument {
    /// Checks the document against the OpenVEX minimum requirements.
    pub fn validate(&self) -> Result<(), VexValidationError> {
        if !self.context.starts_with(OPENVEX_CONTEXT_PREFIX) {
            return Err(VexValidationError::UnsupportedContext(self.context.clone()));
        }

        if self.id.trim().is_empty() {
            return Err(VexValidationError::MissingId);
        }

        for (index, statement) in self.statements.iter().enumerate() {
            if statement.vulnerability.name.trim().is_empty() {
                return Err(VexValidationError::MissingVulnerability { index });
            }

            match statement.status {
                Status::NotAffected
                    if statement.justification.is_none()
                        && statement.impact_statement.is_none() =>
                {
                    return Err(VexValidationError::MissingJustification { index });
                }
                Status::Affected if statement.action_statement.is_none() => {
                    return Err(VexValidationError::MissingActionStatement { index });
                }
                _ => {}
            }
        }

        Ok(())
    }
}
