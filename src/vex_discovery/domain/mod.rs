pub mod component;
pub mod identifiers_bundle;
pub mod image_reference;
pub mod package_url;
pub mod signed_entity;
pub mod vex_document;

pub use component::{Component, HashAlgorithm, IdentifierType};
pub use identifiers_bundle::IdentifiersBundle;
pub use image_reference::{Digest, ImageReference, ReferenceError, ReferenceTarget};
pub use package_url::{PackageUrl, PurlError};
pub use signed_entity::{EntityKind, Platform, PlatformManifest, SignedEntity};
pub use vex_document::{
    Justification, Product, Statement, Status, VexDocument, VexValidationError, Vulnerability,
    OPENVEX_CONTEXT_PREFIX,
};
