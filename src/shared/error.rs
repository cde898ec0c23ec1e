use crate::ports::outbound::RegistryError;
use crate::vex_discovery::domain::PurlError;
use std::fmt;
use thiserror::Error;

/// Exit codes for the CLI application.
///
/// These codes allow CI systems to distinguish between different
/// types of failures and successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success - the probe completed, with or without documents
    Success = 0,
    /// Invalid command-line arguments (clap parsing errors)
    InvalidArguments = 2,
    /// Application error (registry error, invalid identifier, config error, etc.)
    ApplicationError = 3,
}

impl ExitCode {
    /// Convert to i32 for use with std::process::exit
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCode::Success => write!(f, "Success (0)"),
            ExitCode::InvalidArguments => write!(f, "Invalid Arguments (2)"),
            ExitCode::ApplicationError => write!(f, "Application Error (3)"),
        }
    }
}

/// Step of a probe that a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStep {
    ConvertReference,
    ResolveReference,
    DownloadDocuments,
    FetchDocuments,
}

impl fmt::Display for ProbeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProbeStep::ConvertReference => "converting identifier to reference",
            ProbeStep::ResolveReference => "resolving image reference",
            ProbeStep::DownloadDocuments => "downloading documents",
            ProbeStep::FetchDocuments => "fetching documents",
        };
        write!(f, "{}", label)
    }
}

/// Errors surfaced by document discovery.
///
/// Failures inside a prober are wrapped in [`DiscoveryError::Step`] layers
/// naming the step that failed; [`DiscoveryError::root_cause`] strips them.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("the component does not have a supported identifier (expected a package url)")]
    MissingIdentifier,

    #[error("validating purl \"{purl}\": {source}")]
    IdentifierParse {
        purl: String,
        #[source]
        source: PurlError,
    },

    #[error("purl type \"{scheme}\" cannot be mapped to an image reference")]
    UnsupportedScheme { scheme: String },

    #[error("no prober registered for purl type \"{scheme}\"")]
    UnregisteredProber { scheme: String },

    #[error("invalid identifier \"{purl}\": {reason}")]
    InvalidIdentifier { purl: String, reason: String },

    #[error("resolving \"{reference}\": {source}")]
    ReferenceResolution {
        reference: String,
        #[source]
        source: RegistryError,
    },

    #[error("fetching attestations of \"{reference}\": {source}")]
    Fetch {
        reference: String,
        #[source]
        source: RegistryError,
    },

    #[error("{step}: {source}")]
    Step {
        step: ProbeStep,
        #[source]
        source: Box<DiscoveryError>,
    },
}

impl DiscoveryError {
    /// Wraps the error with the name of the step that produced it.
    pub fn in_step(self, step: ProbeStep) -> Self {
        DiscoveryError::Step {
            step,
            source: Box::new(self),
        }
    }

    /// The innermost error below any step wrapping.
    pub fn root_cause(&self) -> &DiscoveryError {
        let mut current = self;
        while let DiscoveryError::Step { source, .. } = current {
            current = source;
        }
        current
    }

    /// Steps this error passed through, outermost first.
    pub fn steps(&self) -> Vec<ProbeStep> {
        let mut steps = Vec::new();
        let mut current = self;
        while let DiscoveryError::Step { step, source } = current {
            steps.push(*step);
            current = source;
        }
        steps
    }

    /// True when the call was abandoned because the caller cancelled it.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.root_cause(),
            DiscoveryError::ReferenceResolution {
                source: RegistryError::Cancelled,
                ..
            } | DiscoveryError::Fetch {
                source: RegistryError::Cancelled,
                ..
            }
        )
    }
}
