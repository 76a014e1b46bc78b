//! # weaver-sync
//!
//! Change detection and run bookkeeping for sync generators.
//!
//! [`GeneratorRegistry`] derives the active generator set from a project
//! graph plus workspace config, using [`hasher`] digests to skip work when
//! nothing changed. [`RunCache`] memoizes one run per generator and
//! [`Runner`] adapts a [`GeneratorEngine`] to a fresh workspace snapshot.

pub mod error;
pub mod hasher;
pub mod registry;
pub mod run_cache;
pub mod runner;

pub use error::SyncError;
pub use registry::{GeneratorRegistry, InputDigests, Reconciliation};
pub use run_cache::{RunCache, RunFuture, RunOutput};
pub use runner::{GeneratorEngine, Runner, WorkspaceSnapshot};
