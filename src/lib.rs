//! Mod Loader - mod discovery, dependency resolution and load planning
//!
//! This crate finds mod packages on disk, validates their descriptors,
//! resolves inter-mod dependencies into a deterministic load order and hands
//! the plan to a host-provided loading capability.
//!
//! ## Design Principles
//!
//! 1. **Localized Failure**: a broken package or unmet dependency excludes only
//!    the affected mods; every problem is recorded, none is swallowed
//! 2. **Injected Host**: instantiation and archive decoding are traits the host
//!    implements; the core knows nothing about host internals
//! 3. **Deterministic Order**: dependencies first, ties broken by discovery order
//!
//! ## Example
//!
//! ```rust,no_run
//! use mod_loader::config::LoaderConfig;
//! use mod_loader::mods::{LoadRequest, ModHandler, ModuleHandle};
//!
//! struct Loaded;
//! impl ModuleHandle for Loaded {}
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut handler = ModHandler::new(LoaderConfig::for_dir("mods"));
//! let mut host = |request: &LoadRequest<'_>| -> anyhow::Result<Box<dyn ModuleHandle>> {
//!     println!("loading {}", request.identifier);
//!     Ok(Box::new(Loaded))
//! };
//!
//! let report = handler.run_cycle(&mut host)?;
//! for problem in &report.problems {
//!     eprintln!("{}", problem);
//! }
//! assert_eq!(handler.loaded_ids().len(), report.summary.loaded.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod mods;
pub mod utils;

pub use config::{LoaderConfig, LoggingConfig};
pub use mods::{ModError, ModHandler};
