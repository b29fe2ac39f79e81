//! Test utilities for mod loader tests
//!
//! Provides a temporary mods directory fixture, an in-memory archive opener and
//! a recording host loader.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use mod_loader::config::LoaderConfig;
use mod_loader::mods::{
    ArchiveOpener, HostLoader, LoadRequest, ModHandler, ModuleHandle, PackageArchive,
    PackageKind, SessionContext,
};

/// Test fixture with an isolated mods directory
pub struct ModsFixture {
    /// Temporary directory for test data
    pub temp_dir: TempDir,
    /// Mods directory path
    pub mods_dir: PathBuf,
    archives: HashMap<PathBuf, Vec<(String, String)>>,
}

impl ModsFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let mods_dir = temp_dir.path().join("mods");
        std::fs::create_dir_all(&mods_dir).expect("create mods dir");
        Self {
            temp_dir,
            mods_dir,
            archives: HashMap::new(),
        }
    }

    pub fn config(&self) -> LoaderConfig {
        LoaderConfig::for_dir(&self.mods_dir)
    }

    /// Handler over the fixture directory with the in-memory archive opener
    pub fn handler(&self) -> ModHandler {
        self.handler_with(self.config())
    }

    pub fn handler_with(&self, config: LoaderConfig) -> ModHandler {
        ModHandler::new(config).with_archive_opener(self.archive_opener())
    }

    pub fn archive_opener(&self) -> Arc<MemoryArchives> {
        Arc::new(MemoryArchives {
            archives: self.archives.clone(),
        })
    }

    /// Raw mod directory containing a descriptor and the given files
    pub fn raw_mod(&self, dir_name: &str, descriptor: &str, files: &[&str]) -> PathBuf {
        let dir = self.mods_dir.join(dir_name);
        std::fs::create_dir_all(&dir).expect("create mod dir");
        std::fs::write(dir.join("mod.toml"), descriptor).expect("write descriptor");
        write_files(&dir, files);
        dir
    }

    /// Directory without a descriptor
    pub fn bare_dir(&self, dir_name: &str, files: &[&str]) -> PathBuf {
        let dir = self.mods_dir.join(dir_name);
        std::fs::create_dir_all(&dir).expect("create dir");
        write_files(&dir, files);
        dir
    }

    /// Plain file directly in the mods directory
    pub fn file(&self, name: &str) -> PathBuf {
        let path = self.mods_dir.join(name);
        std::fs::write(&path, b"binary").expect("write file");
        path
    }

    /// Archive readable through [`MemoryArchives`]
    pub fn archive(&mut self, name: &str, members: &[(&str, &str)]) -> PathBuf {
        let path = self.file(name);
        self.archives.insert(
            path.clone(),
            members
                .iter()
                .map(|(m, c)| (m.to_string(), c.to_string()))
                .collect(),
        );
        path
    }

    /// Archive file the opener cannot read
    pub fn corrupt_archive(&self, name: &str) -> PathBuf {
        self.file(name)
    }
}

/// Write placeholder files; `/`-separated names create subdirectories
fn write_files(dir: &Path, files: &[&str]) {
    for file in files {
        let path = dir.join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create subdirectory");
        }
        std::fs::write(path, b"binary").expect("write mod file");
    }
}

/// Descriptor TOML with required dependencies given as `(id, min_version)`
pub fn descriptor(id: &str, version: &str, deps: &[(&str, &str)]) -> String {
    let mut out = format!("id = \"{}\"\nversion = \"{}\"\n", id, version);
    for (dep, min) in deps {
        out.push_str(&format!(
            "\n[[dependencies]]\nid = \"{}\"\nversion = \"{}\"\n",
            dep, min
        ));
    }
    out
}

/// Descriptor TOML with one optional dependency
pub fn descriptor_with_optional(id: &str, version: &str, optional: &str) -> String {
    format!(
        "id = \"{}\"\nversion = \"{}\"\n\n[[dependencies]]\nid = \"{}\"\noptional = true\n",
        id, version, optional
    )
}

/// Archive opener serving fixture archives from memory
pub struct MemoryArchives {
    archives: HashMap<PathBuf, Vec<(String, String)>>,
}

impl ArchiveOpener for MemoryArchives {
    fn open(&self, path: &Path) -> io::Result<Box<dyn PackageArchive>> {
        match self.archives.get(path) {
            Some(members) => Ok(Box::new(MemoryArchive {
                members: members.clone(),
            })),
            None => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid central directory",
            )),
        }
    }
}

struct MemoryArchive {
    members: Vec<(String, String)>,
}

impl PackageArchive for MemoryArchive {
    fn members(&self) -> Vec<String> {
        self.members.iter().map(|(m, _)| m.clone()).collect()
    }

    fn read_to_string(&mut self, member: &str) -> io::Result<String> {
        self.members
            .iter()
            .find(|(m, _)| m == member)
            .map(|(_, c)| c.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, member.to_string()))
    }
}

/// A host load call as seen by [`RecordingHost`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedLoad {
    pub identifier: String,
    pub kind: PackageKind,
    pub source: PathBuf,
    pub native_module: Option<PathBuf>,
    pub assets: Vec<PathBuf>,
}

/// Host loader that records every request and fails for selected mods
#[derive(Default)]
pub struct RecordingHost {
    pub loads: Vec<RecordedLoad>,
    pub fail: HashSet<String>,
    pub fail_session: HashSet<String>,
    pub sessions: Arc<Mutex<Vec<(String, bool)>>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(ids: &[&str]) -> Self {
        Self {
            fail: ids.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn loaded_ids(&self) -> Vec<&str> {
        self.loads.iter().map(|l| l.identifier.as_str()).collect()
    }
}

impl HostLoader for RecordingHost {
    fn load(&mut self, request: &LoadRequest<'_>) -> anyhow::Result<Box<dyn ModuleHandle>> {
        self.loads.push(RecordedLoad {
            identifier: request.identifier.to_string(),
            kind: request.kind,
            source: request.source.to_path_buf(),
            native_module: request.native_module.map(Path::to_path_buf),
            assets: request.assets.to_vec(),
        });

        if self.fail.contains(request.identifier) {
            anyhow::bail!("module entry point not found");
        }
        Ok(Box::new(RecordingHandle {
            id: request.identifier.to_string(),
            fail_session: self.fail_session.contains(request.identifier),
            sessions: Arc::clone(&self.sessions),
        }))
    }
}

struct RecordingHandle {
    id: String,
    fail_session: bool,
    sessions: Arc<Mutex<Vec<(String, bool)>>>,
}

impl ModuleHandle for RecordingHandle {
    fn on_session_ready(&self, session: &SessionContext) -> anyhow::Result<()> {
        if self.fail_session {
            anyhow::bail!("init class missing");
        }
        self.sessions
            .lock()
            .expect("sessions lock")
            .push((self.id.clone(), session.is_menu));
        Ok(())
    }
}
