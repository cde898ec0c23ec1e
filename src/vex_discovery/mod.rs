/// Domain layer - identifiers, references and VEX documents
///
/// Pure types and translations with no I/O.
pub mod domain;
pub mod services;
