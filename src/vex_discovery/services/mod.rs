pub mod reference_converter;

pub use reference_converter::ReferenceConverter;
