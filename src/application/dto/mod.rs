/// Data Transfer Objects for application layer
///
/// DTOs are used to transfer settings between the application layer
/// and adapters, keeping the domain layer isolated.
mod options;

pub use options::{OciOptions, Options, ProberOptions, OCI_SCHEME};
