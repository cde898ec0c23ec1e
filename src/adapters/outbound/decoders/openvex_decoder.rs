use crate::ports::outbound::{DecodeError, DocumentDecoder};
use crate::vex_discovery::domain::{VexDocument, OPENVEX_CONTEXT_PREFIX};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;

/// Payload type of a DSSE envelope wrapping an in-toto statement.
const IN_TOTO_PAYLOAD_TYPE: &str = "application/vnd.in-toto+json";

/// DSSE envelope as stored in a cosign attestation layer
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    payload_type: String,
    payload: String,
}

/// in-toto statement carrying the VEX document as its predicate
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statement {
    predicate_type: String,
    #[serde(default)]
    predicate: Value,
}

/// OpenVexDecoder adapter for OpenVEX attestations
///
/// Accepts DSSE envelopes, bare in-toto statements and plain OpenVEX
/// documents. Payloads of any other kind are reported as foreign so callers
/// can skip them quietly.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenVexDecoder;

impl OpenVexDecoder {
    pub fn new() -> Self {
        Self
    }

    fn decode_envelope(&self, envelope: Envelope) -> Result<VexDocument, DecodeError> {
        if envelope.payload_type != IN_TOTO_PAYLOAD_TYPE {
            return Err(DecodeError::Foreign {
                reason: format!("envelope payload type is {}", envelope.payload_type),
            });
        }

        let statement = STANDARD
            .decode(envelope.payload.trim())
            .map_err(|e| DecodeError::Encoding {
                reason: e.to_string(),
            })?;

        self.decode_statement(serde_json::from_slice(&statement)?)
    }

    fn decode_statement(&self, statement: Statement) -> Result<VexDocument, DecodeError> {
        if !statement.predicate_type.starts_with(OPENVEX_CONTEXT_PREFIX) {
            return Err(DecodeError::Foreign {
                reason: format!("predicate type is {}", statement.predicate_type),
            });
        }

        self.decode_document(statement.predicate)
    }

    fn decode_document(&self, document: Value) -> Result<VexDocument, DecodeError> {
        let document: VexDocument = serde_json::from_value(document)?;
        document.validate()?;
        Ok(document)
    }
}

impl DocumentDecoder for OpenVexDecoder {
    fn decode(&self, payload: &[u8]) -> Result<VexDocument, DecodeError> {
        let value: Value = serde_json::from_slice(payload).map_err(|e| DecodeError::Foreign {
            reason: format!("payload is not JSON: {}", e),
        })?;

        if value.get("payloadType").is_some() {
            return self.decode_envelope(serde_json::from_value(value)?);
        }
        if value.get("predicateType").is_some() {
            return self.decode_statement(serde_json::from_value(value)?);
        }
        if value.get("@context").is_some() {
            return self.decode_document(value);
        }

        Err(DecodeError::Foreign {
            reason: "payload is neither a DSSE envelope, an in-toto statement nor an OpenVEX document"
                .to_string(),
        })
    }
}
