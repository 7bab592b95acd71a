//! # calsync engine
//!
//! Two-way reconciliation of calendar stores.
//!
//! Two stores share a namespace of record identifiers (UIDs) and are edited
//! independently. For every identifier the engine decides one corrective
//! action (copy, delete, overwrite, ignore or conflict) and applies it, so
//! that repeated runs converge without a central authority or a shared
//! transaction log.
//!
//! ## Design Principles
//!
//! - **Partial information**: each side only knows its own last-synced
//!   fingerprint per identifier
//! - **Convergent**: a second run with no edits in between does nothing
//! - **Deterministic**: strategies are pure functions of the metadata
//! - **Resumable**: identifiers are independent; an interrupted run is
//!   finished by running again
//!
//! ## Core Concepts
//!
//! ### Sync metadata
//!
//! Every store keeps a [`SyncInfo`] per identifier: the fingerprint of the
//! record as it is now and the fingerprint recorded at the last successful
//! sync. Their combination classifies the side as one of [`SyncStatus`]
//! `absent`, `new`, `unmodified`, `modified` or `deleted`.
//!
//! ### Stores
//!
//! The [`SyncStore`] trait is the contract the driver works against.
//! [`MemoryStore`] is an in-memory implementation that keeps tombstones and
//! persists through [`StoreSnapshot`].
//!
//! ### Strategies
//!
//! A [`Strategy`] maps the two sides' metadata to an [`Action`]. The
//! registry [`StrategyKind`] holds the available ones:
//! - [`StrategyKind::Sync`] - symmetric two-way sync (default)
//! - [`StrategyKind::Mirror`] - side A is authoritative
//!
//! ### Driver
//!
//! The [`Driver`] enumerates the union of both stores' identifiers, asks the
//! strategy, executes the action and advances the metadata.
//!
//! ## Quick Start
//!
//! ```rust
//! use calsync_engine::{Action, Driver, MemoryStore, Record, SyncStatus, SyncStore};
//! use serde_json::json;
//!
//! let mut work = MemoryStore::new("work");
//! work.insert(Record::new("evt-1", "Standup", json!({"start": "09:00"})));
//!
//! let mut driver = Driver::new(work, MemoryStore::new("phone"), "sync").unwrap();
//!
//! let report = driver.run_all(false);
//! assert_eq!(report.count(Action::CopyAToB), 1);
//! assert_eq!(driver.store_b().metadata("evt-1").status(), SyncStatus::Unmodified);
//!
//! // Nothing left to do.
//! assert!(driver.run_all(false).is_converged());
//! ```

pub mod driver;
pub mod error;
pub mod record;
pub mod report;
pub mod snapshot;
pub mod store;
pub mod strategy;

// Re-export main types at crate root
pub use driver::Driver;
pub use error::Error;
pub use record::{Fingerprint, Record, SyncInfo, SyncStatus};
pub use report::{Disposition, Outcome, SyncReport};
pub use snapshot::{SnapshotEntry, SnapshotMetadata, StoreSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use store::{MemoryStore, SyncStore};
pub use strategy::{Action, Mirror, Strategy, StrategyKind, TwoWay};

/// Record identifier shared by both stores.
pub type Uid = String;
