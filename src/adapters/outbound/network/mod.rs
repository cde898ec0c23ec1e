/// Network adapters for registry access
mod oci_registry_client;

pub use oci_registry_client::OciRegistryClient;
