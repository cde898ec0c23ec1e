use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use vex_discovery::prelude::VexDocument;

pub const ALPINE_INDEX: &str =
    "sha256:eece025e432126ce23f223450a0326fbebde39cdf496a85d8c016293fc851978";
pub const ALPINE_AMD64: &str =
    "sha256:48d9183eb12a05c99bcc0bf44a003607b8e941e1d4f41f9ad12bdcc4b5672f86";
pub const ALPINE_ARM64: &str =
    "sha256:6457d53fb065d6f250e1504b9bc42d5b6c65941d57532c072d929dd0628977d0";

/// Minimal valid OpenVEX document
pub fn openvex_document(id: &str) -> Value {
    json!({
        "@context": "https://openvex.dev/ns/v0.2.0",
        "@id": id,
        "author": "Alpine Security",
        "timestamp": "2023-09-12T09:00:00Z",
        "version": 1,
        "statements": [
            {
                "vulnerability": { "name": "CVE-2023-38545" },
                "products": [
                    { "@id": "pkg:oci/alpine", "identifiers": { "purl": "pkg:oci/alpine" } }
                ],
                "status": "not_affected",
                "justification": "vulnerable_code_not_present"
            }
        ]
    })
}

fn dsse(predicate_type: &str, predicate: Value) -> Vec<u8> {
    let statement = json!({
        "_type": "https://in-toto.io/Statement/v0.1",
        "predicateType": predicate_type,
        "subject": [ { "name": "index.docker.io/library/alpine", "digest": { "sha256": "eece" } } ],
        "predicate": predicate
    });

    serde_json::to_vec(&json!({
        "payloadType": "application/vnd.in-toto+json",
        "payload": STANDARD.encode(serde_json::to_vec(&statement).unwrap()),
        "signatures": []
    }))
    .unwrap()
}

/// DSSE envelope carrying an OpenVEX attestation
pub fn openvex_attestation(id: &str) -> Vec<u8> {
    dsse("https://openvex.dev/ns/v0.2.0", openvex_document(id))
}

/// DSSE envelope carrying an SPDX SBOM attestation
pub fn sbom_attestation() -> Vec<u8> {
    dsse(
        "https://spdx.dev/Document",
        json!({ "spdxVersion": "SPDX-2.3", "name": "alpine" }),
    )
}

pub fn vex_document(id: &str) -> VexDocument {
    serde_json::from_value(openvex_document(id)).unwrap()
}
