//! vex-discovery - discover OpenVEX documents for software components
//!
//! Given a component identified by a package URL, this library locates the
//! VEX documents its publisher attached to it. Container images
//! (`pkg:oci/...`) are served by a built-in prober that reads cosign
//! attestations from the image's registry; other package types can be
//! served by registering additional probers.
//!
//! # Architecture
//!
//! The library is organized into the following layers:
//!
//! - **Domain Layer** (`vex_discovery`): package URLs, image references,
//!   VEX documents and the identifier conversion rules
//! - **Application Layer** (`application`): the discovery agent, probers and use cases
//! - **Ports** (`ports`): Interface definitions for infrastructure
//! - **Adapters** (`adapters`): Concrete implementations of ports
//! - **Shared** (`shared`): Common utilities and error types
//!
//! # Example
//!
//! ```no_run
//! use vex_discovery::prelude::*;
//!
//! # async fn run() -> Result<()> {
//! let agent = DiscoveryAgent::new()?;
//! let documents = agent
//!     .probe_purl("pkg:oci/alpine?repository_url=cgr.dev/chainguard&tag=latest")
//!     .await?;
//!
//! for document in documents {
//!     println!("{} ({} statements)", document.id, document.statements.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod ports;
pub mod shared;
pub mod vex_discovery;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapters::outbound::decoders::OpenVexDecoder;
    pub use crate::adapters::outbound::filesystem::{FileSystemWriter, StdoutPresenter};
    pub use crate::adapters::outbound::network::OciRegistryClient;
    pub use crate::application::dto::{OciOptions, Options, ProberOptions, OCI_SCHEME};
    pub use crate::application::probers::OciProber;
    pub use crate::application::use_cases::{
        DiscoveryAgent, GenerateIdentifiersUseCase, ProberRegistry,
    };
    pub use crate::ports::inbound::DiscoveryPort;
    pub use crate::ports::outbound::{
        DecodeError, DocumentDecoder, OutputPresenter, Prober, RegistryClient, RegistryError,
    };
    pub use crate::shared::error::{DiscoveryError, ExitCode, ProbeStep};
    pub use crate::shared::Result;
    pub use crate::vex_discovery::domain::{
        Component, Digest, HashAlgorithm, IdentifierType, IdentifiersBundle, ImageReference,
        PackageUrl, Platform, SignedEntity, VexDocument,
    };
    pub use crate::vex_discovery::services::ReferenceConverter;
}
