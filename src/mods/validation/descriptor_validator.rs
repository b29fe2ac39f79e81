//! Descriptor validation
//!
//! Validates mod descriptors for structure and dependency sanity before they
//! become [`ModInfo`](crate::mods::registry::manifest::ModInfo) values.

use std::collections::HashSet;
use tracing::debug;

use crate::mods::registry::manifest::{parse_version, ModDescriptor};

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Descriptor is valid
    Valid,
    /// Descriptor is invalid with specific errors
    Invalid(Vec<String>),
}

/// Maximum identifier length
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Descriptor validator
pub struct DescriptorValidator;

impl DescriptorValidator {
    /// Create a new descriptor validator
    pub fn new() -> Self {
        Self
    }

    /// Validate a mod descriptor
    pub fn validate(&self, descriptor: &ModDescriptor) -> ValidationResult {
        let mut errors = Vec::new();

        if !is_valid_identifier(&descriptor.id) {
            errors.push(format!(
                "Invalid mod identifier: {:?} (must be alphanumeric with dashes/underscores)",
                descriptor.id
            ));
        }

        if parse_version(&descriptor.version).is_err() {
            errors.push(format!(
                "Invalid version format: {} (expected semantic versioning)",
                descriptor.version
            ));
        }

        if let Err(dep_errors) = self.validate_dependencies(descriptor) {
            errors.extend(dep_errors);
        }

        if errors.is_empty() {
            debug!("Descriptor validation passed for mod: {}", descriptor.id);
            ValidationResult::Valid
        } else {
            debug!(
                "Descriptor validation failed for mod {}: {:?}",
                descriptor.id, errors
            );
            ValidationResult::Invalid(errors)
        }
    }

    fn validate_dependencies(&self, descriptor: &ModDescriptor) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for dep in &descriptor.dependencies {
            if !is_valid_identifier(&dep.id) {
                errors.push(format!("Invalid dependency identifier: {:?}", dep.id));
            }
            if dep.id == descriptor.id {
                errors.push(format!("Mod {} declares a dependency on itself", dep.id));
            }
            if !seen.insert(dep.id.as_str()) {
                errors.push(format!("Dependency {} declared more than once", dep.id));
            }
            if parse_version(&dep.version).is_err() {
                errors.push(format!(
                    "Invalid dependency version format: {} (for dependency: {})",
                    dep.version, dep.id
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for DescriptorValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `id` can be used as a mod identifier
///
/// Alphanumeric start, then alphanumerics, dashes or underscores.
#[inline]
pub fn is_valid_identifier(id: &str) -> bool {
    if id.is_empty() || id.len() > MAX_IDENTIFIER_LEN {
        return false;
    }

    if !id.chars().next().map_or(false, |c| c.is_alphanumeric()) {
        return false;
    }

    id.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mods::registry::manifest::DescriptorDependency;

    fn descriptor(id: &str, version: &str) -> ModDescriptor {
        ModDescriptor {
            id: id.to_string(),
            name: None,
            version: version.to_string(),
            description: None,
            authors: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    fn dependency(id: &str) -> DescriptorDependency {
        DescriptorDependency {
            id: id.to_string(),
            version: "1.0".to_string(),
            optional: false,
        }
    }

    #[test]
    fn test_identifier_rules() {
        assert!(is_valid_identifier("ModA"));
        assert!(is_valid_identifier("mod_a-2"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("-leading"));
        assert!(!is_valid_identifier("has space"));
        assert!(!is_valid_identifier("dotted.name"));
        assert!(!is_valid_identifier(&"x".repeat(MAX_IDENTIFIER_LEN + 1)));
    }

    #[test]
    fn test_valid_descriptor() {
        let mut d = descriptor("mod-a", "1.0.0");
        d.dependencies.push(dependency("mod-b"));
        assert_eq!(DescriptorValidator::new().validate(&d), ValidationResult::Valid);
    }

    #[test]
    fn test_invalid_descriptor_collects_all_errors() {
        let mut d = descriptor("bad id", "nope");
        d.dependencies.push(dependency("x"));
        d.dependencies.push(dependency("x"));

        match DescriptorValidator::new().validate(&d) {
            ValidationResult::Invalid(errors) => assert_eq!(errors.len(), 3),
            ValidationResult::Valid => panic!("expected invalid descriptor"),
        }
    }
}
