//! Mod discovery
//!
//! Scans the mods directory and classifies each entry into a package kind.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::LoaderConfig;
use crate::mods::problems::{ProblemKind, ProblemReporter, Stage};
use crate::mods::registry::entries::{LoadingEntry, LoadingEntryRegistry};
use crate::mods::registry::manifest::{ModDescriptor, ModInfo};
use crate::mods::traits::{ArchiveOpener, ModError, UnsupportedArchives};
use crate::mods::validation::is_valid_identifier;

/// How a mod was packaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageKind {
    /// Archive bundle with a descriptor inside
    Archive,
    /// Unpackaged development directory
    RawDirectory,
    /// Bare native module file
    NativeModule,
    /// Bare container asset file
    AssetBundle,
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PackageKind::Archive => "archive",
            PackageKind::RawDirectory => "raw",
            PackageKind::NativeModule => "native",
            PackageKind::AssetBundle => "assets",
        })
    }
}

/// Outcome of classifying one filesystem entry
#[derive(Debug)]
pub enum Classification {
    /// A valid loading entry
    Accepted(LoadingEntry),
    /// Rejected as an invalid entry; a problem has been recorded
    Rejected(LoadingEntry),
    /// Not a mod candidate at all
    Ignored,
}

/// Mod discovery scanner and package classifier
pub struct ModDiscovery {
    mods_dir: PathBuf,
    descriptor_name: String,
    archive_extensions: Vec<String>,
    native_extensions: Vec<String>,
    asset_extensions: Vec<String>,
    allow_raw_mods: bool,
    disabled_mods: Vec<String>,
    archives: Arc<dyn ArchiveOpener>,
}

impl ModDiscovery {
    /// Create a scanner with default settings for `mods_dir`
    pub fn new<P: AsRef<Path>>(mods_dir: P) -> Self {
        let config = LoaderConfig {
            mods_dir: mods_dir.as_ref().to_path_buf(),
            ..LoaderConfig::default()
        };
        Self::with_config(&config)
    }

    /// Create a scanner from loader configuration
    pub fn with_config(config: &LoaderConfig) -> Self {
        let lower = |exts: &[String]| -> Vec<String> {
            exts.iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect()
        };

        Self {
            mods_dir: config.mods_dir.clone(),
            descriptor_name: config.descriptor_name.clone(),
            archive_extensions: lower(&config.archive_extensions),
            native_extensions: lower(&config.native_extensions),
            asset_extensions: lower(&config.asset_extensions),
            allow_raw_mods: config.allow_raw_mods,
            disabled_mods: config.disabled_mods.clone(),
            archives: Arc::new(UnsupportedArchives),
        }
    }

    /// Use `opener` to read archive bundles
    pub fn with_archive_opener(mut self, opener: Arc<dyn ArchiveOpener>) -> Self {
        self.archives = opener;
        self
    }

    pub fn mods_dir(&self) -> &Path {
        &self.mods_dir
    }

    /// Scan the mods directory and register every valid candidate
    ///
    /// Returns the number of newly registered entries. Only failing to read the
    /// directory itself is an error; bad candidates become problems.
    pub fn discover_mods(
        &self,
        registry: &mut LoadingEntryRegistry,
        reporter: &mut ProblemReporter,
    ) -> Result<usize, ModError> {
        info!("Discovering mods in {:?}", self.mods_dir);

        if !self.mods_dir.exists() {
            debug!("Mods directory does not exist, creating: {:?}", self.mods_dir);
            fs::create_dir_all(&self.mods_dir)?;
            return Ok(0);
        }

        // Collect candidates
        let mut paths = fs::read_dir(&self.mods_dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        // read_dir order is platform dependent
        paths.sort();

        // Classify and register each candidate
        let mut registered = 0;
        for path in paths {
            match self.classify(&path, reporter) {
                Classification::Accepted(entry) => {
                    if self.disabled_mods.iter().any(|id| id == entry.identifier()) {
                        debug!("Mod {} is disabled, skipping", entry.identifier());
                        continue;
                    }
                    if registry.register(entry, reporter) {
                        registered += 1;
                    }
                }
                Classification::Rejected(entry) => registry.reject(entry),
                Classification::Ignored => {}
            }
        }

        info!(
            "Discovered {} mods ({} rejected)",
            registered,
            registry.rejected().len()
        );
        Ok(registered)
    }

    /// Classify a single filesystem entry
    pub fn classify(&self, path: &Path, reporter: &mut ProblemReporter) -> Classification {
        let file_name = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => return Classification::Ignored,
        };
        if file_name.starts_with('.') {
            debug!("Ignoring hidden entry {:?}", path);
            return Classification::Ignored;
        }

        if path.is_dir() {
            return self.classify_directory(path, &file_name, reporter);
        }

        match extension_of(path) {
            Some(ext) if self.archive_extensions.contains(&ext) => {
                self.classify_archive(path, reporter)
            }
            Some(ext) if self.native_extensions.contains(&ext) => {
                self.classify_bare_file(path, PackageKind::NativeModule, reporter)
            }
            Some(ext) if self.asset_extensions.contains(&ext) => {
                self.classify_bare_file(path, PackageKind::AssetBundle, reporter)
            }
            _ => {
                debug!("Ignoring unrecognised file {:?}", path);
                Classification::Ignored
            }
        }
    }

    fn classify_archive(&self, path: &Path, reporter: &mut ProblemReporter) -> Classification {
        let kind = PackageKind::Archive;

        // Open the archive through the injected reader
        let mut archive = match self.archives.open(path) {
            Ok(archive) => archive,
            Err(e) => {
                return reject(path, kind, format!("failed to open archive: {}", e), reporter);
            }
        };

        // The descriptor must sit at the archive root
        let members = archive.members();
        if !members.iter().any(|m| *m == self.descriptor_name) {
            return reject(
                path,
                kind,
                format!("no {} found in archive", self.descriptor_name),
                reporter,
            );
        }

        // Parse and validate the descriptor
        let info = match archive
            .read_to_string(&self.descriptor_name)
            .map_err(ModError::from)
            .and_then(|contents| ModDescriptor::parse(&contents))
            .and_then(ModDescriptor::into_info)
        {
            Ok(info) => info,
            Err(e) => return reject(path, kind, e.to_string(), reporter),
        };

        let member_paths: Vec<PathBuf> = members.iter().map(PathBuf::from).collect();
        self.build_entry(info, kind, path, member_paths, reporter)
    }

    fn classify_directory(
        &self,
        dir: &Path,
        dir_name: &str,
        reporter: &mut ProblemReporter,
    ) -> Classification {
        // Collect files at any depth, like archive members
        let files = match list_files(dir) {
            Ok(files) => files,
            Err(e) => {
                return reject(
                    dir,
                    PackageKind::RawDirectory,
                    format!("failed to read directory: {}", e),
                    reporter,
                )
            }
        };

        // No descriptor at the root: development build named after its directory
        let descriptor_path = dir.join(&self.descriptor_name);
        if !descriptor_path.is_file() {
            return self.classify_raw_fallback(dir, dir_name, files, reporter);
        }

        // Parse and validate the descriptor
        let info = match ModDescriptor::from_file(&descriptor_path).and_then(ModDescriptor::into_info) {
            Ok(info) => info,
            Err(e) => return reject(dir, PackageKind::RawDirectory, e.to_string(), reporter),
        };
        self.build_entry(info, PackageKind::RawDirectory, dir, files, reporter)
    }

    /// Descriptor-less development directory: the directory name becomes the identifier
    ///
    /// Only ever produced for directories, never for archives.
    fn classify_raw_fallback(
        &self,
        dir: &Path,
        dir_name: &str,
        files: Vec<PathBuf>,
        reporter: &mut ProblemReporter,
    ) -> Classification {
        if !self.allow_raw_mods {
            return reject(
                dir,
                PackageKind::RawDirectory,
                format!("no {} found and raw mods are disabled", self.descriptor_name),
                reporter,
            );
        }
        if !is_valid_identifier(dir_name) {
            return reject(
                dir,
                PackageKind::RawDirectory,
                format!(
                    "no {} found and directory name {:?} is not a valid mod identifier",
                    self.descriptor_name, dir_name
                ),
                reporter,
            );
        }
        if !files.iter().any(|f| self.is_native(f) || self.is_asset(f)) {
            return reject(
                dir,
                PackageKind::RawDirectory,
                format!("no {} and no loadable files found", self.descriptor_name),
                reporter,
            );
        }

        debug!("Using directory name as identifier for raw mod {:?}", dir);
        self.build_entry(
            ModInfo::synthetic(dir_name),
            PackageKind::RawDirectory,
            dir,
            files,
            reporter,
        )
    }

    fn classify_bare_file(
        &self,
        path: &Path,
        kind: PackageKind,
        reporter: &mut ProblemReporter,
    ) -> Classification {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !is_valid_identifier(&stem) {
            return reject(
                path,
                kind,
                format!("file name {:?} is not a valid mod identifier", stem),
                reporter,
            );
        }

        // The file itself is the whole package
        let (native_module, assets) = match kind {
            PackageKind::NativeModule => (Some(path.to_path_buf()), Vec::new()),
            _ => (None, vec![path.to_path_buf()]),
        };
        Classification::Accepted(LoadingEntry::new(
            ModInfo::synthetic(stem),
            kind,
            path.to_path_buf(),
            native_module,
            assets,
        ))
    }

    /// Pick the native module and assets out of a package's files
    fn build_entry(
        &self,
        info: ModInfo,
        kind: PackageKind,
        source: &Path,
        files: Vec<PathBuf>,
        reporter: &mut ProblemReporter,
    ) -> Classification {
        // Split loadable files by extension
        let mut natives: Vec<PathBuf> = files.iter().filter(|f| self.is_native(f)).cloned().collect();
        let mut assets: Vec<PathBuf> = files.into_iter().filter(|f| self.is_asset(f)).collect();
        natives.sort();
        assets.sort();

        // At most one native module per package
        if natives.len() > 1 {
            let names = natives
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let reason = format!("{} contains more than one native module: {}", info.id, names);
            let entry = LoadingEntry::new(info, kind, source.to_path_buf(), None, assets);
            return reject_entry(entry, reason, reporter);
        }

        let entry = LoadingEntry::new(info, kind, source.to_path_buf(), natives.pop(), assets);
        debug!(
            "Classified {:?} as {} mod {} ({:?})",
            source,
            kind,
            entry.identifier(),
            entry.contents()
        );
        Classification::Accepted(entry)
    }

    fn is_native(&self, path: &Path) -> bool {
        extension_of(path).map_or(false, |e| self.native_extensions.contains(&e))
    }

    fn is_asset(&self, path: &Path) -> bool {
        extension_of(path).map_or(false, |e| self.asset_extensions.contains(&e))
    }
}

fn reject(
    path: &Path,
    kind: PackageKind,
    reason: String,
    reporter: &mut ProblemReporter,
) -> Classification {
    reject_entry(LoadingEntry::invalid(kind, path.to_path_buf()), reason, reporter)
}

fn reject_entry(entry: LoadingEntry, reason: String, reporter: &mut ProblemReporter) -> Classification {
    reporter.record(
        Stage::Discovery,
        entry.source().display().to_string(),
        ProblemKind::BrokenPackage(reason),
    );
    Classification::Rejected(entry.into_invalid())
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

/// Regular files anywhere below `dir`, skipping hidden entries
///
/// Symlinked directories are not followed.
fn list_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                pending.push(path);
            } else if path.is_file() {
                files.push(path);
            }
        }
    }
    Ok(files)
}
