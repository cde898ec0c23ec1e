/// Outbound adapters - Infrastructure implementations of outbound ports
pub mod decoders;
pub mod filesystem;
pub mod network;
