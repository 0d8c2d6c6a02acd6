//! Core indexing, sync, job, and duplicate-detection engine for the Curio
//! media catalog.
//!
//! This crate implements THE CORE of the system (`spec.md` §1): library
//! synchronization, post ingestion, the job runtime, the cron scheduler,
//! and duplicate detection. Everything the core treats as an external
//! collaborator — HTTP transport, auth, the SPA client, CLI entry points —
//! lives outside this crate; the collaborator *interfaces* the core
//! depends on (media source, file identity, content hashing, media
//! backend) are defined in `curio-contracts` and implemented here.

pub mod catalog;
pub mod duplicates;
pub mod hashing;
pub mod identity;
pub mod ingestion;
pub mod jobs;
pub mod logging;
pub mod media_backend;
pub mod media_source;
pub mod query;
pub mod scheduler;
pub mod services;
pub mod sync;

pub use curio_contracts::error::{CoreError, Result};
