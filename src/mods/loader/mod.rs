//! Mod loading
//!
//! Executes the resolved load plan against the host and keeps the live containers.

pub mod container;
pub mod executor;

pub use container::{LoadedMods, ModContainer};
pub use executor::{LoadPlanExecutor, LoadSummary};
