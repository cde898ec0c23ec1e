/// Mock implementations for testing
mod mock_prober;
mod mock_registry_client;

pub use mock_prober::MockProber;
pub use mock_registry_client::MockRegistryClient;
