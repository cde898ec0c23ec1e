/// Scheme-specific probers shipped with the crate
pub mod oci;

pub use oci::OciProber;
