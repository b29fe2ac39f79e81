//! Mod system traits and interfaces
//!
//! Defines the capabilities the host injects into the pipeline (instantiation,
//! archive decoding, session notification) and the caller-visible error type.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::mods::problems::Stage;
use crate::mods::registry::discovery::PackageKind;
use crate::mods::registry::manifest::ModInfo;

/// Everything the host needs to instantiate one mod
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest<'a> {
    /// Mod identifier
    pub identifier: &'a str,
    /// Frozen metadata
    pub info: &'a ModInfo,
    /// How the mod was packaged
    pub kind: PackageKind,
    /// Archive file, directory or bare file the mod was discovered from
    pub source: &'a Path,
    /// Native module path (archive member path for archive bundles)
    pub native_module: Option<&'a Path>,
    /// Container asset paths (archive member paths for archive bundles)
    pub assets: &'a [PathBuf],
}

/// Context handed to live mods once the host session is available
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// Host session name, if the host has one
    pub name: Option<String>,
    /// Whether the session is the host's menu session rather than a real world
    pub is_menu: bool,
}

impl SessionContext {
    /// Context for a regular session
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            is_menu: false,
        }
    }

    /// Context for the host's menu session
    pub fn menu() -> Self {
        Self {
            name: None,
            is_menu: true,
        }
    }
}

/// Opaque host-side handle of an instantiated mod
///
/// Handles are shared read-only once a cycle completes, hence `Send + Sync`.
pub trait ModuleHandle: Send + Sync {
    /// Late initialization once a host session becomes available
    fn on_session_ready(&self, _session: &SessionContext) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Host instantiation capability
pub trait HostLoader {
    /// Instantiate one mod; the error's message becomes the recorded reason
    fn load(&mut self, request: &LoadRequest<'_>) -> anyhow::Result<Box<dyn ModuleHandle>>;
}

impl<F> HostLoader for F
where
    F: FnMut(&LoadRequest<'_>) -> anyhow::Result<Box<dyn ModuleHandle>>,
{
    fn load(&mut self, request: &LoadRequest<'_>) -> anyhow::Result<Box<dyn ModuleHandle>> {
        self(request)
    }
}

/// An opened archive bundle
pub trait PackageArchive {
    /// Member paths, `/`-separated and relative to the archive root
    fn members(&self) -> Vec<String>;

    /// Read one member as UTF-8 text
    fn read_to_string(&mut self, member: &str) -> io::Result<String>;
}

/// Archive decoding capability
pub trait ArchiveOpener: Send + Sync {
    /// Open the archive at `path`
    fn open(&self, path: &Path) -> io::Result<Box<dyn PackageArchive>>;
}

/// Opener used when the host did not inject one; every archive is broken
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedArchives;

impl ArchiveOpener for UnsupportedArchives {
    fn open(&self, path: &Path) -> io::Result<Box<dyn PackageArchive>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("no archive reader configured for {}", path.display()),
        ))
    }
}

/// Mod system errors
#[derive(Debug, Error)]
pub enum ModError {
    #[error("Mod not found: {0}")]
    ModNotFound(String),

    #[error("Stage {stage} aborted: {count} problem(s) recorded")]
    StageAborted { stage: Stage, count: usize },

    #[error("Invalid mod descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Mod operation failed: {0}")]
    OperationError(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
