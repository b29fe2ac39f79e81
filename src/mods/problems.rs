//! Problem accumulation for one discovery + load cycle
//!
//! Every pipeline stage records non-fatal problems here instead of aborting.
//! The orchestrator inspects them between stages through [`ProblemReporter::checkpoint`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::warn;

use crate::mods::traits::ModError;

/// Pipeline stage a problem was recorded in
///
/// Stages are ordered: a checkpoint for a stage also covers every earlier stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Filesystem scan, classification and registration
    Discovery,
    /// Dependency validation and ordering
    Resolution,
    /// Host instantiation of the resolved plan
    Loading,
    /// Post-load session notification
    Session,
}

impl Stage {
    /// Stage name used in logs and reports
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Discovery => "discovery",
            Stage::Resolution => "resolution",
            Stage::Loading => "loading",
            Stage::Session => "session",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What went wrong; the `Display` output is the human-readable reason
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "details", rename_all = "snake_case")]
pub enum ProblemKind {
    #[error("duplicate mod identifier {identifier} (first registered from {first_source})")]
    DuplicateIdentifier {
        identifier: String,
        first_source: String,
    },

    #[error("broken package: {0}")]
    BrokenPackage(String),

    #[error("{dependent} requires {target}, which is not installed")]
    MissingDependency { dependent: String, target: String },

    #[error("{dependent} requires {target} >= {required}, but {found} is installed")]
    IncompatibleVersion {
        dependent: String,
        target: String,
        required: String,
        found: String,
    },

    #[error("dependency cycle between {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    #[error("{dependent} requires {dependency}, which was excluded from the load order")]
    ExcludedDependency {
        dependent: String,
        dependency: String,
    },

    #[error("failed to load {identifier}: {reason}")]
    RuntimeLoadFailure { identifier: String, reason: String },

    #[error("{dependent} was not loaded because its dependency {failed} failed to load")]
    CascadingLoadFailure { dependent: String, failed: String },

    #[error("session notification for {identifier} failed: {reason}")]
    SessionFailure { identifier: String, reason: String },
}

/// A single recorded problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    /// Stage the problem was recorded in
    pub stage: Stage,
    /// Mod identifier or filesystem path the problem is about
    pub subject: String,
    /// Problem details
    pub kind: ProblemKind,
}

impl Problem {
    /// Human-readable reason
    pub fn reason(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.subject, self.kind)
    }
}

/// Ordered, cycle-scoped problem accumulator
///
/// Created (or reset with [`begin_cycle`](Self::begin_cycle)) at the start of a
/// cycle and passed explicitly to each stage.
#[derive(Debug, Default)]
pub struct ProblemReporter {
    problems: Vec<Problem>,
}

impl ProblemReporter {
    /// Create an empty reporter
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear everything recorded by a previous cycle
    pub fn begin_cycle(&mut self) {
        self.problems.clear();
    }

    /// Append a problem
    pub fn record(&mut self, stage: Stage, subject: impl Into<String>, kind: ProblemKind) {
        let problem = Problem {
            stage,
            subject: subject.into(),
            kind,
        };
        warn!("{}", problem);
        self.problems.push(problem);
    }

    /// Fail with [`ModError::StageAborted`] if anything was recorded for `stage`
    /// or an earlier stage since the last drain
    pub fn checkpoint(&self, stage: Stage) -> Result<(), ModError> {
        let count = self.problems.iter().filter(|p| p.stage <= stage).count();
        if count == 0 {
            Ok(())
        } else {
            Err(ModError::StageAborted { stage, count })
        }
    }

    /// Return and clear all recorded problems
    pub fn drain(&mut self) -> Vec<Problem> {
        std::mem::take(&mut self.problems)
    }

    /// All recorded problems, in recording order
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    /// Problems recorded for exactly `stage`
    pub fn problems_for(&self, stage: Stage) -> impl Iterator<Item = &Problem> {
        self.problems.iter().filter(move |p| p.stage == stage)
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    /// Number of recorded problems
    pub fn len(&self) -> usize {
        self.problems.len()
    }
}
