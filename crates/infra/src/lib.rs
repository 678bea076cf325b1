//! `reliefstock-infra`
//!
//! **Responsibility:** persistence and orchestration.
//!
//! - `store`: the `WarehouseStore` repository trait plus in-memory (dev/test)
//!   and Postgres implementations. Every mutating trait method is one
//!   transaction.
//! - `materializer`: the approval pipeline, including the atomic
//!   contribution to inventory item plus seed event projection.
//! - `ledger`: the shipment tracking operations (dispatch, delivery,
//!   corrections, manual milestones, timeline reads).
//! - `expiry`: the stateless perishables view.
//! - `registry`: the consumed destination-name lookup collaborator.

pub mod error;
pub mod expiry;
pub mod ledger;
pub mod materializer;
pub mod registry;
pub mod store;

mod integration_tests;

pub use error::ServiceError;
pub use expiry::ExpiryMonitor;
pub use ledger::{DispatchDetails, TrackingLedger};
pub use materializer::{DecisionOutcome, Materializer};
pub use registry::{InMemoryRegistry, RegistryLookup};
pub use store::{InMemoryStore, ItemStateUpdate, PostgresStore, StoreError, WarehouseStore};
