//! Live mod containers
//!
//! Post-load registry of successfully instantiated mods. Read-only once a load
//! cycle completes.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::mods::registry::discovery::PackageKind;
use crate::mods::registry::manifest::ModInfo;
use crate::mods::traits::{ModError, ModuleHandle};

/// A loaded mod: frozen metadata plus the host's handle
pub struct ModContainer {
    info: ModInfo,
    kind: PackageKind,
    source: PathBuf,
    handle: Box<dyn ModuleHandle>,
}

impl ModContainer {
    pub fn new(info: ModInfo, kind: PackageKind, source: PathBuf, handle: Box<dyn ModuleHandle>) -> Self {
        Self {
            info,
            kind,
            source,
            handle,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.info.id
    }

    pub fn info(&self) -> &ModInfo {
        &self.info
    }

    pub fn kind(&self) -> PackageKind {
        self.kind
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn handle(&self) -> &dyn ModuleHandle {
        self.handle.as_ref()
    }
}

impl fmt::Debug for ModContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModContainer")
            .field("id", &self.info.id)
            .field("version", &self.info.version.to_string())
            .field("kind", &self.kind)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Loaded mods in load order, keyed by identifier
#[derive(Debug, Default)]
pub struct LoadedMods {
    containers: Vec<ModContainer>,
    index: HashMap<String, usize>,
}

impl LoadedMods {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a container; an identifier is never loaded twice
    pub(crate) fn insert(&mut self, container: ModContainer) -> Result<(), ModError> {
        let id = container.identifier().to_string();
        if self.index.contains_key(&id) {
            return Err(ModError::OperationError(format!(
                "Mod {} is already loaded",
                id
            )));
        }
        self.index.insert(id, self.containers.len());
        self.containers.push(container);
        Ok(())
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Container for `id`, or [`ModError::ModNotFound`]
    pub fn get(&self, id: &str) -> Result<&ModContainer, ModError> {
        self.index
            .get(id)
            .map(|&i| &self.containers[i])
            .ok_or_else(|| ModError::ModNotFound(id.to_string()))
    }

    /// Identifiers in load order
    pub fn ids(&self) -> Vec<&str> {
        self.containers.iter().map(|c| c.identifier()).collect()
    }

    /// Containers in load order
    pub fn iter(&self) -> impl Iterator<Item = &ModContainer> {
        self.containers.iter()
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}
