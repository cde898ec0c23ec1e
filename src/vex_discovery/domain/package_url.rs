use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const SCHEME: &str = "pkg:";

/// Errors raised while parsing a package URL string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurlError {
    #[error("package url must start with \"pkg:\"")]
    MissingScheme,

    #[error("package url has no type")]
    MissingType,

    #[error("invalid package url type \"{0}\"")]
    InvalidType(String),

    #[error("package url has no name")]
    MissingName,

    #[error("invalid qualifier \"{0}\"")]
    InvalidQualifier(String),

    #[error("invalid percent-encoding in \"{0}\"")]
    InvalidEncoding(String),
}

/// NewType-style value object for a parsed package URL
///
/// Parsing follows the `pkg:<type>/<namespace>/<name>@<version>?<qualifiers>#<subpath>`
/// grammar. Qualifier keys are lowercased and kept sorted so that the
/// canonical string form is stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageUrl {
    purl_type: String,
    namespace: Option<String>,
    name: String,
    version: Option<String>,
    qualifiers: BTreeMap<String, String>,
    subpath: Option<String>,
}

impl PackageUrl {
    /// Creates a package URL from its parts. `purl_type` is lowercased.
    pub fn new(purl_type: &str, name: &str) -> Result<Self, PurlError> {
        let purl_type = purl_type.to_lowercase();
        validate_type(&purl_type)?;
        if name.is_empty() {
            return Err(PurlError::MissingName);
        }

        Ok(Self {
            purl_type,
            namespace: None,
            name: name.to_string(),
            version: None,
            qualifiers: BTreeMap::new(),
            subpath: None,
        })
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = (!namespace.is_empty()).then(|| namespace.to_string());
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = (!version.is_empty()).then(|| version.to_string());
        self
    }

    /// Adds a qualifier. Empty values are dropped, as the purl grammar requires.
    pub fn with_qualifier(mut self, key: &str, value: &str) -> Result<Self, PurlError> {
        let key = key.to_lowercase();
        validate_qualifier_key(&key)?;
        if !value.is_empty() {
            self.qualifiers.insert(key, value.to_string());
        }
        Ok(self)
    }

    pub fn purl_type(&self) -> &str {
        &self.purl_type
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn qualifier(&self, key: &str) -> Option<&str> {
        self.qualifiers.get(key).map(String::as_str)
    }

    pub fn qualifiers(&self) -> &BTreeMap<String, String> {
        &self.qualifiers
    }

    pub fn subpath(&self) -> Option<&str> {
        self.subpath.as_deref()
    }
}

impl FromStr for PackageUrl {
    type Err = PurlError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let scheme = input.get(..SCHEME.len()).ok_or(PurlError::MissingScheme)?;
        if !scheme.eq_ignore_ascii_case(SCHEME) {
            return Err(PurlError::MissingScheme);
        }
        let remainder = input[SCHEME.len()..].trim_start_matches('/');

        let (remainder, subpath) = match remainder.split_once('#') {
            Some((head, subpath)) => (head, parse_subpath(subpath)?),
            None => (remainder, None),
        };

        let (remainder, qualifiers) = match remainder.split_once('?') {
            Some((head, query)) => (head, parse_qualifiers(query)?),
            None => (remainder, BTreeMap::new()),
        };

        let (remainder, version) = match remainder.rfind('@') {
            Some(at) => {
                let version = decode(&remainder[at + 1..])?;
                (&remainder[..at], (!version.is_empty()).then_some(version))
            }
            None => (remainder, None),
        };

        let (purl_type, path) = remainder.split_once('/').ok_or(PurlError::MissingType)?;
        let purl_type = purl_type.to_lowercase();
        validate_type(&purl_type)?;

        let path = path.trim_matches('/');
        let (namespace, name) = match path.rsplit_once('/') {
            Some((namespace, name)) => (Some(namespace), name),
            None => (None, path),
        };

        let name = decode(name)?;
        if name.is_empty() {
            return Err(PurlError::MissingName);
        }

        let namespace = match namespace {
            Some(raw) => {
                let segments = raw
                    .split('/')
                    .filter(|segment| !segment.is_empty())
                    .map(decode)
                    .collect::<Result<Vec<_>, _>>()?;
                (!segments.is_empty()).then(|| segments.join("/"))
            }
            None => None,
        };

        Ok(Self {
            purl_type,
            namespace,
            name,
            version,
            qualifiers,
            subpath,
        })
    }
}

impl fmt::Display for PackageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/", SCHEME, self.purl_type)?;

        if let Some(namespace) = &self.namespace {
            for segment in namespace.split('/') {
                write!(f, "{}/", urlencoding::encode(segment))?;
            }
        }
        write!(f, "{}", urlencoding::encode(&self.name))?;

        if let Some(version) = &self.version {
            write!(f, "@{}", urlencoding::encode(version))?;
        }

        let mut separator = '?';
        for (key, value) in &self.qualifiers {
            write!(f, "{}{}={}", separator, key, urlencoding::encode(value))?;
            separator = '&';
        }

        if let Some(subpath) = &self.subpath {
            let encoded: Vec<_> = subpath.split('/').map(urlencoding::encode).collect();
            write!(f, "#{}", encoded.join("/"))?;
        }

        Ok(())
    }
}

fn decode(raw: &str) -> Result<String, PurlError> {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| PurlError::InvalidEncoding(raw.to_string()))
}

fn validate_type(purl_type: &str) -> Result<(), PurlError> {
    if purl_type.is_empty() {
        return Err(PurlError::MissingType);
    }

    let valid_chars = purl_type
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '+' || c == '-');
    let starts_with_digit = purl_type.starts_with(|c: char| c.is_ascii_digit());

    if !valid_chars || starts_with_digit {
        return Err(PurlError::InvalidType(purl_type.to_string()));
    }
    Ok(())
}

fn validate_qualifier_key(key: &str) -> Result<(), PurlError> {
    let valid = !key.is_empty()
        && !key.starts_with(|c: char| c.is_ascii_digit())
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_');

    if !valid {
        return Err(PurlError::InvalidQualifier(key.to_string()));
    }
    Ok(())
}

fn parse_qualifiers(query: &str) -> Result<BTreeMap<String, String>, PurlError> {
    let mut qualifiers = BTreeMap::new();

    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| PurlError::InvalidQualifier(pair.to_string()))?;
        let key = key.to_lowercase();
        validate_qualifier_key(&key)?;

        let value = decode(value)?;
        if !value.is_empty() {
            qualifiers.insert(key, value);
        }
    }

    Ok(qualifiers)
}

fn parse_subpath(raw: &str) -> Result<Option<String>, PurlError> {
    let segments = raw
        .split('/')
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .map(decode)
        .collect::<Result<Vec<_>, _>>()?;

    Ok((!segments.is_empty()).then(|| segments.join("/")))
}
