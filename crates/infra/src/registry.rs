//! Destination registry lookup.
//!
//! Orphanage and disaster registries are owned by another part of the system;
//! the ledger only needs to resolve a `(kind, id)` pair to a display name at
//! dispatch time, so the seam is this one read-only trait.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use reliefstock_tracking::DestinationKind;

use crate::store::StoreError;

#[async_trait]
pub trait RegistryLookup: Send + Sync {
    /// `Ok(None)` means the destination does not exist.
    async fn resolve_destination_name(
        &self,
        kind: DestinationKind,
        id: i64,
    ) -> Result<Option<String>, StoreError>;
}

#[async_trait]
impl<R: RegistryLookup + ?Sized> RegistryLookup for Arc<R> {
    async fn resolve_destination_name(
        &self,
        kind: DestinationKind,
        id: i64,
    ) -> Result<Option<String>, StoreError> {
        (**self).resolve_destination_name(kind, id).await
    }
}

/// Registry backed by a map, populated at wiring time.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    names: RwLock<HashMap<(DestinationKind, i64), String>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: DestinationKind, id: i64, name: impl Into<String>) {
        if let Ok(mut names) = self.names.write() {
            names.insert((kind, id), name.into());
        }
    }
}

#[async_trait]
impl RegistryLookup for InMemoryRegistry {
    async fn resolve_destination_name(
        &self,
        kind: DestinationKind,
        id: i64,
    ) -> Result<Option<String>, StoreError> {
        let names = self
            .names
            .read()
            .map_err(|_| StoreError::storage("registry lock poisoned"))?;
        Ok(names.get(&(kind, id)).cloned())
    }
}
