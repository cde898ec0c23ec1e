mod discovery_agent;
mod generate_identifiers;

pub use discovery_agent::{DiscoveryAgent, ProberRegistry};
pub use generate_identifiers::GenerateIdentifiersUseCase;
