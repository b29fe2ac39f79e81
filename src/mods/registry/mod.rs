//! Mod registry and discovery
//!
//! Handles mod discovery, descriptor parsing, the loading entry registry and
//! dependency resolution.

pub mod dependencies;
pub mod discovery;
pub mod entries;
pub mod manifest;

pub use dependencies::{DependencyResolver, ResolvedLoadOrder};
pub use discovery::{Classification, ModDiscovery, PackageKind};
pub use entries::{LoadingEntry, LoadingEntryRegistry, PackageContents};
pub use manifest::{DependencyDecl, MetadataOrigin, ModDescriptor, ModInfo};
