use std::sync::Arc;

use anyhow::Context;

use reliefstock_infra::{
    ExpiryMonitor, InMemoryRegistry, InMemoryStore, Materializer, PostgresStore, RegistryLookup,
    TrackingLedger, WarehouseStore,
};
use reliefstock_risk::RuleBasedAssessor;
use reliefstock_tracking::DestinationKind;

pub type DynStore = Arc<dyn WarehouseStore>;
pub type DynRegistry = Arc<dyn RegistryLookup>;

pub struct AppServices {
    pub materializer: Materializer<DynStore>,
    pub ledger: TrackingLedger<DynStore, DynRegistry>,
    pub monitor: ExpiryMonitor<DynStore>,
    pub store: DynStore,
}

impl AppServices {
    pub fn new(store: DynStore, registry: DynRegistry) -> Self {
        Self {
            materializer: Materializer::new(store.clone())
                .with_assessor(Arc::new(RuleBasedAssessor::new())),
            ledger: TrackingLedger::new(store.clone(), registry),
            monitor: ExpiryMonitor::new(store.clone()),
            store,
        }
    }
}

/// Store selection is environment-driven: `USE_PERSISTENT_STORE=true` plus
/// `DATABASE_URL` picks Postgres, anything else the in-memory store.
pub async fn build_services() -> anyhow::Result<AppServices> {
    let use_persistent = std::env::var("USE_PERSISTENT_STORE")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    let store: DynStore = if use_persistent {
        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set when USE_PERSISTENT_STORE=true")?;
        let store = PostgresStore::connect(&database_url)
            .await
            .context("failed to connect to Postgres")?;
        tracing::info!("using Postgres store");
        Arc::new(store)
    } else {
        tracing::info!("using in-memory store");
        Arc::new(InMemoryStore::new())
    };

    Ok(AppServices::new(store, Arc::new(registry_from_env())))
}

/// Destination registries live in another system; until that integration
/// lands, entries come from `DESTINATIONS`, a comma-separated list of
/// `kind:id:name` triples (e.g. `orphanage:1:Sunrise Home`).
fn registry_from_env() -> InMemoryRegistry {
    let registry = InMemoryRegistry::new();
    let Ok(raw) = std::env::var("DESTINATIONS") else {
        return registry;
    };
    for entry in raw.split(',').filter(|e| !e.trim().is_empty()) {
        let mut parts = entry.splitn(3, ':');
        let parsed = match (parts.next(), parts.next(), parts.next()) {
            (Some(kind), Some(id), Some(name)) => kind
                .trim()
                .parse::<DestinationKind>()
                .ok()
                .zip(id.trim().parse::<i64>().ok())
                .map(|(kind, id)| (kind, id, name.trim().to_string())),
            _ => None,
        };
        match parsed {
            Some((kind, id, name)) => registry.register(kind, id, name),
            None => tracing::warn!("ignoring malformed DESTINATIONS entry '{entry}'"),
        }
    }
    registry
}
