//! Mod handler orchestrating one discovery + load cycle
//!
//! Runs discovery, dependency resolution and load plan execution in strict
//! sequence, with a problem checkpoint between stages, and exposes the query
//! surface over the loaded mods.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::LoaderConfig;
use crate::mods::loader::{LoadPlanExecutor, LoadSummary, LoadedMods, ModContainer};
use crate::mods::problems::{Problem, ProblemKind, ProblemReporter, Stage};
use crate::mods::registry::{DependencyResolver, LoadingEntryRegistry, ModDiscovery, ResolvedLoadOrder};
use crate::mods::traits::{ArchiveOpener, HostLoader, ModError, SessionContext};

/// Where the handler is within the current cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CyclePhase {
    Idle,
    Discovered,
    Resolved,
    Loaded,
}

/// Outcome of [`ModHandler::run_cycle`]
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Resolved load order of this cycle
    pub load_order: Vec<String>,
    /// Per-mod execution outcome
    pub summary: LoadSummary,
    /// Every problem recorded during the cycle
    pub problems: Vec<Problem>,
}

/// Mod handler coordinates discovery, resolution and loading
pub struct ModHandler {
    config: LoaderConfig,
    discovery: ModDiscovery,
    registry: LoadingEntryRegistry,
    order: Option<ResolvedLoadOrder>,
    loaded: LoadedMods,
    reporter: ProblemReporter,
    phase: CyclePhase,
}

impl ModHandler {
    /// Create a handler; archives are rejected until an opener is injected
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            discovery: ModDiscovery::with_config(&config),
            config,
            registry: LoadingEntryRegistry::new(),
            order: None,
            loaded: LoadedMods::new(),
            reporter: ProblemReporter::new(),
            phase: CyclePhase::Idle,
        }
    }

    /// Use `opener` to read archive bundles
    pub fn with_archive_opener(mut self, opener: Arc<dyn ArchiveOpener>) -> Self {
        self.discovery = self.discovery.with_archive_opener(opener);
        self
    }

    /// Run discovery, resolution and loading with checkpoints in between
    ///
    /// With `abort_on_problems` the first failing checkpoint ends the cycle with
    /// [`ModError::StageAborted`]; otherwise problems are logged and the cycle
    /// carries on without the affected mods.
    pub fn run_cycle(&mut self, host: &mut dyn HostLoader) -> Result<CycleReport, ModError> {
        info!("Starting mod loading cycle");

        self.discover_mods()?;
        self.stage_checkpoint(Stage::Discovery)?;

        let load_order = self.check_dependencies()?.ids().to_vec();
        self.stage_checkpoint(Stage::Resolution)?;

        let summary = self.load_mods(host)?;
        self.stage_checkpoint(Stage::Loading)?;

        info!(
            "Mod loading cycle finished: {} loaded, {} problem(s)",
            self.loaded.len(),
            self.reporter.len()
        );
        Ok(CycleReport {
            load_order,
            summary,
            problems: self.reporter.problems().to_vec(),
        })
    }

    /// Start a new cycle and discover all mods in the mods directory
    pub fn discover_mods(&mut self) -> Result<usize, ModError> {
        self.reporter.begin_cycle();
        self.registry.clear();
        self.order = None;
        self.phase = CyclePhase::Idle;

        let count = self.discovery.discover_mods(&mut self.registry, &mut self.reporter)?;
        self.phase = CyclePhase::Discovered;
        Ok(count)
    }

    /// Ensure that all dependencies of discovered mods exist and order them
    pub fn check_dependencies(&mut self) -> Result<&ResolvedLoadOrder, ModError> {
        self.expect_phase(CyclePhase::Discovered, "check dependencies")?;

        let order = DependencyResolver::resolve(&self.registry, &mut self.reporter);
        self.phase = CyclePhase::Resolved;
        Ok(self.order.insert(order))
    }

    /// Instantiate the resolved mods through the host
    pub fn load_mods(&mut self, host: &mut dyn HostLoader) -> Result<LoadSummary, ModError> {
        self.expect_phase(CyclePhase::Resolved, "load mods")?;
        let order = self.order.as_ref().ok_or_else(|| {
            ModError::OperationError("No resolved load order".to_string())
        })?;

        let summary = LoadPlanExecutor::execute(
            order,
            &self.registry,
            host,
            &mut self.loaded,
            &mut self.reporter,
        );
        self.phase = CyclePhase::Loaded;
        Ok(summary)
    }

    /// Notify every live mod, in load order, that a host session is ready
    ///
    /// Returns the number of mods notified successfully.
    pub fn on_session_ready(&mut self, session: &SessionContext) -> usize {
        info!(
            "Session ready (menu: {}), notifying {} mods",
            session.is_menu,
            self.loaded.len()
        );

        let mut notified = 0;
        for container in self.loaded.iter() {
            match container.handle().on_session_ready(session) {
                Ok(()) => notified += 1,
                Err(e) => self.reporter.record(
                    Stage::Session,
                    container.identifier().to_string(),
                    ProblemKind::SessionFailure {
                        identifier: container.identifier().to_string(),
                        reason: format!("{:#}", e),
                    },
                ),
            }
        }
        notified
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.loaded.is_loaded(id)
    }

    /// Loaded mod by identifier, or [`ModError::ModNotFound`]
    pub fn get_loaded(&self, id: &str) -> Result<&ModContainer, ModError> {
        self.loaded.get(id)
    }

    /// Identifiers of loaded mods, in load order
    pub fn loaded_ids(&self) -> Vec<&str> {
        self.loaded.ids()
    }

    pub fn loaded_mods(&self) -> &LoadedMods {
        &self.loaded
    }

    /// Entries discovered in the current cycle
    pub fn registry(&self) -> &LoadingEntryRegistry {
        &self.registry
    }

    /// Load order of the current cycle, once resolved
    pub fn load_order(&self) -> Option<&ResolvedLoadOrder> {
        self.order.as_ref()
    }

    /// Problems recorded so far in the current cycle
    pub fn problems(&self) -> &[Problem] {
        self.reporter.problems()
    }

    /// Take the recorded problems for final reporting
    pub fn drain_problems(&mut self) -> Vec<Problem> {
        self.reporter.drain()
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    fn stage_checkpoint(&self, stage: Stage) -> Result<(), ModError> {
        match self.reporter.checkpoint(stage) {
            Ok(()) => Ok(()),
            Err(e) if self.config.abort_on_problems => {
                error!("{}", e);
                Err(e)
            }
            Err(e) => {
                warn!("{}, continuing without the affected mods", e);
                Ok(())
            }
        }
    }

    fn expect_phase(&self, expected: CyclePhase, action: &str) -> Result<(), ModError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(ModError::OperationError(format!(
                "Cannot {} in phase {:?} (expected {:?})",
                action, self.phase, expected
            )))
        }
    }
}
