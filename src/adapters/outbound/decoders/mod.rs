/// Decoders turning raw attestation payloads into domain documents
mod openvex_decoder;

pub use openvex_decoder::OpenVexDecoder;
