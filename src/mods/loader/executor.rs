//! Load plan execution
//!
//! Walks the resolved order strictly in sequence and hands each entry to the
//! host. A runtime failure retracts every not-yet-executed mod that requires
//! the failed one.

use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::mods::loader::container::{LoadedMods, ModContainer};
use crate::mods::problems::{ProblemKind, ProblemReporter, Stage};
use crate::mods::registry::dependencies::ResolvedLoadOrder;
use crate::mods::registry::entries::{LoadingEntry, LoadingEntryRegistry};
use crate::mods::traits::{HostLoader, LoadRequest};

/// What happened to each planned mod
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Instantiated in this run, in load order
    pub loaded: Vec<String>,
    /// Failed or retracted in this run
    pub failed: Vec<String>,
    /// Already loaded by an earlier cycle
    pub already_loaded: Vec<String>,
}

/// Load plan executor
pub struct LoadPlanExecutor;

impl LoadPlanExecutor {
    /// Instantiate every mod of `order` through `host`
    pub fn execute(
        order: &ResolvedLoadOrder,
        registry: &LoadingEntryRegistry,
        host: &mut dyn HostLoader,
        loaded: &mut LoadedMods,
        reporter: &mut ProblemReporter,
    ) -> LoadSummary {
        info!("Loading {} mods", order.len());

        let mut summary = LoadSummary::default();
        let mut failed: HashSet<&str> = HashSet::new();

        for id in order.ids() {
            let entry = match registry.get(id) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Planned mod {} has no loading entry: {}", id, e);
                    continue;
                }
            };

            if loaded.is_loaded(id) {
                debug!("Mod {} is already loaded, not reconstructing", id);
                summary.already_loaded.push(id.clone());
                continue;
            }

            let failed_dep = entry
                .info()
                .required_dependencies()
                .find(|dep| failed.contains(dep.id.as_str()));
            if let Some(dep) = failed_dep {
                reporter.record(
                    Stage::Loading,
                    id.clone(),
                    ProblemKind::CascadingLoadFailure {
                        dependent: id.clone(),
                        failed: dep.id.clone(),
                    },
                );
                failed.insert(id);
                summary.failed.push(id.clone());
                continue;
            }

            match Self::load_entry(entry, host, loaded) {
                Ok(()) => {
                    info!("Mod {} loaded successfully", id);
                    summary.loaded.push(id.clone());
                }
                Err(reason) => {
                    reporter.record(
                        Stage::Loading,
                        id.clone(),
                        ProblemKind::RuntimeLoadFailure {
                            identifier: id.clone(),
                            reason,
                        },
                    );
                    failed.insert(id);
                    summary.failed.push(id.clone());
                }
            }
        }

        info!(
            "Loaded {} mods ({} failed)",
            summary.loaded.len(),
            summary.failed.len()
        );
        summary
    }

    fn load_entry(
        entry: &LoadingEntry,
        host: &mut dyn HostLoader,
        loaded: &mut LoadedMods,
    ) -> Result<(), String> {
        let request = LoadRequest {
            identifier: entry.identifier(),
            info: entry.info(),
            kind: entry.kind(),
            source: entry.source(),
            native_module: entry.native_module(),
            assets: entry.assets(),
        };

        let handle = host.load(&request).map_err(|e| format!("{:#}", e))?;
        loaded
            .insert(ModContainer::new(
                entry.info().clone(),
                entry.kind(),
                entry.source().to_path_buf(),
                handle,
            ))
            .map_err(|e| e.to_string())
    }
}
