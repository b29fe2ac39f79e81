//! Descriptor validation
//!
//! Validates mod descriptors before they are turned into metadata.

pub mod descriptor_validator;

pub use descriptor_validator::{is_valid_identifier, DescriptorValidator, ValidationResult};
