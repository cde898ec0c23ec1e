use super::{HashAlgorithm, IdentifierType};
use serde::Serialize;
use std::collections::BTreeMap;

/// IdentifiersBundle - every identifier and hash an artifact can be found under
///
/// Values keep their first-seen order and are never duplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdentifiersBundle {
    pub identifiers: BTreeMap<IdentifierType, Vec<String>>,
    pub hashes: BTreeMap<HashAlgorithm, Vec<String>>,
}

impl IdentifiersBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the value was already present.
    pub fn add_identifier(&mut self, kind: IdentifierType, value: String) -> bool {
        push_unique(self.identifiers.entry(kind).or_default(), value)
    }

    /// Returns false when the value was already present.
    pub fn add_hash(&mut self, algorithm: HashAlgorithm, value: String) -> bool {
        push_unique(self.hashes.entry(algorithm).or_default(), value)
    }

    pub fn identifiers_of(&self, kind: IdentifierType) -> &[String] {
        self.identifiers.get(&kind).map_or(&[], Vec::as_slice)
    }

    pub fn hashes_of(&self, algorithm: HashAlgorithm) -> &[String] {
        self.hashes.get(&algorithm).map_or(&[], Vec::as_slice)
    }
}

fn push_unique(values: &mut Vec<String>, value: String) -> bool {
    if values.contains(&value) {
        return false;
    }
    values.push(value);
    true
}
