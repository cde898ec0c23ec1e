/// Outbound ports (Driven ports) - Infrastructure interfaces
///
/// These ports define the interfaces that the application core uses
/// to interact with external systems (registries, document formats) and
/// the plug-in seam for scheme-specific probers.
pub mod document_decoder;
pub mod output_presenter;
pub mod prober;
pub mod registry_client;

pub use document_decoder::{DecodeError, DocumentDecoder};
pub use output_presenter::OutputPresenter;
pub use prober::Prober;
pub use registry_client::{RegistryClient, RegistryError};
