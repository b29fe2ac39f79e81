//! Mod descriptor parsing and the metadata model
//!
//! Handles parsing `mod.toml` descriptors into immutable [`ModInfo`] values.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::mods::traits::ModError;
use crate::mods::validation::{DescriptorValidator, ValidationResult};

/// Descriptor file contents (`mod.toml` structure)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModDescriptor {
    /// Mod identifier
    pub id: String,
    /// Display name (defaults to the identifier)
    #[serde(default)]
    pub name: Option<String>,
    /// Mod version (`major.minor` or full semantic version)
    pub version: String,
    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
    /// Mod authors
    #[serde(default)]
    pub authors: Vec<String>,
    /// Declared dependencies, in declaration order
    #[serde(default)]
    pub dependencies: Vec<DescriptorDependency>,
}

/// One `[[dependencies]]` table of a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorDependency {
    /// Target mod identifier
    pub id: String,
    /// Minimum acceptable version
    #[serde(default = "default_min_version")]
    pub version: String,
    /// Optional dependencies only influence ordering
    #[serde(default)]
    pub optional: bool,
}

fn default_min_version() -> String {
    "0.0.0".to_string()
}

/// Where a [`ModInfo`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataOrigin {
    /// Parsed from a descriptor file
    Descriptor,
    /// Made up from a directory or file name
    Synthetic,
}

/// A parsed dependency declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDecl {
    /// Target mod identifier
    pub id: String,
    /// Minimum acceptable version
    pub min_version: Version,
    /// Whether absence excludes the dependent
    pub required: bool,
}

impl DependencyDecl {
    /// Whether `found` satisfies this declaration's minimum
    pub fn is_satisfied_by(&self, found: &Version) -> bool {
        *found >= self.min_version
    }
}

/// Immutable description of a mod package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModInfo {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Mod version
    pub version: Version,
    /// Dependency declarations, in declaration order
    pub dependencies: Vec<DependencyDecl>,
    /// Human-readable description
    pub description: String,
    /// Mod authors
    pub authors: Vec<String>,
    /// Descriptor-backed or synthetic
    pub origin: MetadataOrigin,
}

impl ModInfo {
    /// Synthetic metadata for a mod without a descriptor
    pub fn synthetic(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            version: Version::new(0, 0, 0),
            dependencies: Vec::new(),
            description: String::new(),
            authors: Vec::new(),
            origin: MetadataOrigin::Synthetic,
        }
    }

    /// Dependency-equality: identifiers match
    pub fn dependency_eq(&self, other: &ModInfo) -> bool {
        self.id == other.id
    }

    /// Required dependency declarations
    pub fn required_dependencies(&self) -> impl Iterator<Item = &DependencyDecl> {
        self.dependencies.iter().filter(|d| d.required)
    }

    /// Optional dependency declarations
    pub fn optional_dependencies(&self) -> impl Iterator<Item = &DependencyDecl> {
        self.dependencies.iter().filter(|d| !d.required)
    }

    pub fn is_synthetic(&self) -> bool {
        self.origin == MetadataOrigin::Synthetic
    }
}

impl ModDescriptor {
    /// Load a descriptor from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ModError::InvalidDescriptor(format!("Failed to read descriptor file: {}", e))
        })?;
        Self::parse(&contents)
    }

    /// Parse descriptor TOML
    pub fn parse(contents: &str) -> Result<Self, ModError> {
        toml::from_str(contents).map_err(|e| {
            ModError::InvalidDescriptor(format!("Failed to parse descriptor TOML: {}", e))
        })
    }

    /// Validate and convert into a [`ModInfo`]
    pub fn into_info(self) -> Result<ModInfo, ModError> {
        if let ValidationResult::Invalid(errors) = DescriptorValidator::new().validate(&self) {
            return Err(ModError::InvalidDescriptor(errors.join("; ")));
        }

        let version = parse_version(&self.version)?;
        let dependencies = self
            .dependencies
            .into_iter()
            .map(|dep| {
                Ok(DependencyDecl {
                    min_version: parse_version(&dep.version)?,
                    id: dep.id,
                    required: !dep.optional,
                })
            })
            .collect::<Result<Vec<_>, ModError>>()?;

        Ok(ModInfo {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            version,
            dependencies,
            description: self.description.unwrap_or_default(),
            authors: self.authors,
            origin: MetadataOrigin::Descriptor,
        })
    }
}

/// Parse a version, accepting `major.minor` as `major.minor.0`
pub fn parse_version(version: &str) -> Result<Version, ModError> {
    let version = version.trim();
    if let Ok(parsed) = Version::parse(version) {
        return Ok(parsed);
    }

    // Only the numeric core may be short; prerelease/build suffixes stay where they are
    let split_at = version.find(['-', '+']).unwrap_or(version.len());
    let (core, suffix) = version.split_at(split_at);
    if core.split('.').count() == 2 {
        if let Ok(parsed) = Version::parse(&format!("{}.0{}", core, suffix)) {
            return Ok(parsed);
        }
    }

    Err(ModError::InvalidDescriptor(format!(
        "Invalid version: {} (expected major.minor[.patch])",
        version
    )))
}
