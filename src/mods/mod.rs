//! Mod system
//!
//! Discovers mod packages, validates their descriptors, resolves dependencies
//! into a deterministic load order and hands the plan to the host.
//!
//! ## Pipeline
//!
//! 1. **Discovery**: each entry of the mods directory is classified as an archive
//!    bundle, raw development directory, bare native module or bare asset bundle
//! 2. **Resolution**: missing, outdated and cyclic dependencies exclude the
//!    affected mods and their dependents; survivors are topologically sorted
//! 3. **Loading**: the host instantiates mods in order; runtime failures retract
//!    dependents that have not run yet
//!
//! Problems never abort a stage. They accumulate in a [`ProblemReporter`] and are
//! checked between stages.

pub mod loader;
pub mod manager;
pub mod problems;
pub mod registry;
pub mod traits;
pub mod validation;

pub use loader::{LoadPlanExecutor, LoadSummary, LoadedMods, ModContainer};
pub use manager::{CycleReport, ModHandler};
pub use problems::{Problem, ProblemKind, ProblemReporter, Stage};
pub use registry::{
    DependencyResolver, LoadingEntry, LoadingEntryRegistry, ModDescriptor, ModDiscovery, ModInfo,
    PackageKind, ResolvedLoadOrder,
};
pub use traits::{
    ArchiveOpener, HostLoader, LoadRequest, ModError, ModuleHandle, PackageArchive,
    SessionContext, UnsupportedArchives,
};
