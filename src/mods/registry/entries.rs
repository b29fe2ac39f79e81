//! Loading entries and the registry that owns them
//!
//! One entry per discovered candidate; the registry is write-once per identifier.
//! Rejected candidates are kept as invalid entries next to the registered ones.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::mods::problems::{ProblemKind, ProblemReporter, Stage};
use crate::mods::registry::discovery::PackageKind;
use crate::mods::registry::manifest::ModInfo;
use crate::mods::traits::ModError;

/// What a package carries besides its metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageContents {
    /// Neither a native module nor container assets
    MetadataOnly,
    /// Only a native module
    NativeModule,
    /// Only container assets
    Assets,
    /// Native module and container assets
    NativeModuleAndAssets,
}

/// One discovered mod candidate
#[derive(Debug, Clone)]
pub struct LoadingEntry {
    is_valid: bool,
    info: ModInfo,
    kind: PackageKind,
    source: PathBuf,
    native_module: Option<PathBuf>,
    assets: Vec<PathBuf>,
}

impl LoadingEntry {
    /// Create a valid entry
    pub fn new(
        info: ModInfo,
        kind: PackageKind,
        source: PathBuf,
        native_module: Option<PathBuf>,
        assets: Vec<PathBuf>,
    ) -> Self {
        Self {
            is_valid: true,
            info,
            kind,
            source,
            native_module,
            assets,
        }
    }

    /// Placeholder for a candidate rejected before its metadata could be read
    ///
    /// The identifier is made up from the file or directory name.
    pub fn invalid(kind: PackageKind, source: PathBuf) -> Self {
        let name = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            is_valid: false,
            info: ModInfo::synthetic(name),
            kind,
            source,
            native_module: None,
            assets: Vec::new(),
        }
    }

    /// Mark this entry as rejected, keeping what was learned about it
    pub fn into_invalid(mut self) -> Self {
        self.is_valid = false;
        self
    }

    pub fn identifier(&self) -> &str {
        &self.info.id
    }

    pub fn info(&self) -> &ModInfo {
        &self.info
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn kind(&self) -> PackageKind {
        self.kind
    }

    /// Archive file, directory or bare file the entry was discovered from
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn native_module(&self) -> Option<&Path> {
        self.native_module.as_deref()
    }

    pub fn assets(&self) -> &[PathBuf] {
        &self.assets
    }

    /// Unpackaged development mod (a directory), as opposed to an archive-derived one
    pub fn is_raw_mod(&self) -> bool {
        self.kind == PackageKind::RawDirectory
    }

    pub fn contents(&self) -> PackageContents {
        match (self.native_module.is_some(), self.assets.is_empty()) {
            (false, true) => PackageContents::MetadataOnly,
            (true, true) => PackageContents::NativeModule,
            (false, false) => PackageContents::Assets,
            (true, false) => PackageContents::NativeModuleAndAssets,
        }
    }
}

/// Identifier-keyed registry of loading entries
#[derive(Debug, Default)]
pub struct LoadingEntryRegistry {
    entries: Vec<LoadingEntry>,
    index: HashMap<String, usize>,
    rejected: Vec<LoadingEntry>,
}

impl LoadingEntryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry; the first registration of an identifier wins
    ///
    /// Returns `false` and records a duplicate problem if the identifier is taken
    /// or the entry is invalid. Invalid entries end up in [`rejected`](Self::rejected).
    pub fn register(&mut self, entry: LoadingEntry, reporter: &mut ProblemReporter) -> bool {
        if !entry.is_valid() {
            self.reject(entry);
            return false;
        }

        let id = entry.identifier().to_string();
        if let Some(&existing) = self.index.get(&id) {
            reporter.record(
                Stage::Discovery,
                entry.source().display().to_string(),
                ProblemKind::DuplicateIdentifier {
                    identifier: id.clone(),
                    first_source: self.entries[existing].source().display().to_string(),
                },
            );
            self.reject(entry);
            return false;
        }

        debug!("Registered mod {} from {:?}", id, entry.source());
        self.index.insert(id, self.entries.len());
        self.entries.push(entry);
        true
    }

    /// Remember a discovered-but-rejected candidate as an invalid entry
    pub fn reject(&mut self, entry: LoadingEntry) {
        debug!("Rejected mod candidate {:?}", entry.source());
        self.rejected.push(entry.into_invalid());
    }

    /// Look up an entry by identifier
    pub fn get(&self, id: &str) -> Result<&LoadingEntry, ModError> {
        self.index
            .get(id)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| ModError::ModNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Insertion position of an identifier
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Entries in registration order
    pub fn entries(&self) -> &[LoadingEntry] {
        &self.entries
    }

    /// Rejected candidates in discovery order; never valid
    pub fn rejected(&self) -> &[LoadingEntry] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.rejected.clear();
    }
}
