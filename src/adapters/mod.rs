/// Adapters layer - Infrastructure implementations
///
/// This layer contains concrete implementations of the ports,
/// providing the actual integration with registries, document formats
/// and output destinations.
pub mod outbound;
