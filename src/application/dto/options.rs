use crate::ports::outbound::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Span;

/// Package URL type served by the OCI prober.
pub const OCI_SCHEME: &str = "oci";

/// Options understood by the OCI prober
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OciOptions {
    /// Repository prefix used when the purl has no `repository_url` qualifier.
    #[serde(default)]
    pub repository: Option<String>,

    /// Repository prefix that replaces whatever the purl says.
    #[serde(default)]
    pub repository_override: Option<String>,
}

impl OciOptions {
    pub fn with_repository(mut self, repository: &str) -> Self {
        self.repository = Some(repository.to_string());
        self
    }

    pub fn with_repository_override(mut self, repository: &str) -> Self {
        self.repository_override = Some(repository.to_string());
        self
    }
}

/// Scheme-specific prober options
///
/// `Custom` carries free-form settings for probers registered outside this
/// crate. A prober that finds no entry, or an entry of another shape, under
/// its scheme falls back to its default configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ProberOptions {
    Oci(OciOptions),
    Custom(serde_json::Value),
}

/// Options - per-agent settings passed down to every prober call
///
/// Cloning is cheap; the cancellation token and span are shared handles.
#[derive(Debug, Clone)]
pub struct Options {
    /// Prober options keyed by package URL type.
    pub prober_options: HashMap<String, ProberOptions>,
    /// Cancelling this token aborts in-flight registry calls.
    pub cancellation: CancellationToken,
    /// Upper bound for each registry call.
    pub timeout: Option<Duration>,
    /// Parent span for the tracing events emitted while probing.
    pub span: Span,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            prober_options: HashMap::new(),
            cancellation: CancellationToken::new(),
            timeout: None,
            span: Span::none(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prober_options(mut self, scheme: &str, options: ProberOptions) -> Self {
        self.prober_options.insert(scheme.to_string(), options);
        self
    }

    pub fn with_oci_options(self, options: OciOptions) -> Self {
        self.with_prober_options(OCI_SCHEME, ProberOptions::Oci(options))
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// OCI options, or the defaults when absent or of another shape.
    pub fn oci_options(&self) -> OciOptions {
        match self.prober_options.get(OCI_SCHEME) {
            Some(ProberOptions::Oci(options)) => options.clone(),
            _ => OciOptions::default(),
        }
    }

    /// Runs a registry operation bounded by the timeout and the
    /// cancellation token, whichever fires first.
    pub async fn guard<T, F>(&self, operation: F) -> Result<T, RegistryError>
    where
        F: Future<Output = Result<T, RegistryError>>,
    {
        let timeout = self.timeout;
        let bounded = async move {
            match timeout {
                Some(limit) => match tokio::time::timeout(limit, operation).await {
                    Ok(result) => result,
                    Err(_) => Err(RegistryError::TimedOut { after: limit }),
                },
                None => operation.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(RegistryError::Cancelled),
            result = bounded => result,
        }
    }
}
