//! In-memory store for development and tests.
//!
//! All mutations happen under one write lock, so each trait method is atomic
//! exactly like a database transaction in the Postgres implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use reliefstock_contributions::{Contribution, ContributionStatus};
use reliefstock_core::{ContributionId, TrackId, Uid};
use reliefstock_inventory::InventoryItem;
use reliefstock_tracking::{
    EventPatch, NewTrackingEvent, TrackingEvent, latest_by_track_id, sort_timeline,
};

use super::{ItemStateUpdate, StoreError, WarehouseStore};

#[derive(Debug, Default)]
struct State {
    contributions: HashMap<ContributionId, Contribution>,
    items: Vec<InventoryItem>,
    events: Vec<TrackingEvent>,
    next_track_id: i64,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<State>,
    /// Injects a failure between the inventory insert and the seed event
    /// insert of `approve_and_materialize`, to exercise the all-or-nothing
    /// guarantee.
    #[cfg(test)]
    pub(crate) fail_before_seed: std::sync::atomic::AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_err<T>(_: T) -> StoreError {
        StoreError::storage("store lock poisoned")
    }

    fn push_event(state: &mut State, event: NewTrackingEvent) -> TrackingEvent {
        state.next_track_id += 1;
        let stored = TrackingEvent {
            track_id: TrackId::new(state.next_track_id),
            uid: event.uid,
            status: event.status,
            from_location: event.from_location,
            to_type: event.to_type,
            to_name: event.to_name,
            dispatched_by: event.dispatched_by,
            dispatch_date: event.dispatch_date,
            delivered_date: event.delivered_date,
            remarks: event.remarks,
            created_at: event.created_at,
        };
        state.events.push(stored.clone());
        stored
    }

    fn apply_item_update(state: &mut State, uid: &Uid, update: &ItemStateUpdate) {
        if let Some(item) = state.items.iter_mut().find(|i| &i.uid == uid) {
            if let Some(status) = update.status {
                item.status = status;
            }
            if let Some(location) = &update.location {
                item.location = location.clone();
            }
        }
    }

    fn check_latest(
        state: &State,
        uid: &Uid,
        expected: TrackId,
    ) -> Result<TrackingEvent, StoreError> {
        let events: Vec<TrackingEvent> = state
            .events
            .iter()
            .filter(|e| &e.uid == uid)
            .cloned()
            .collect();
        let latest = latest_by_track_id(&events).ok_or(StoreError::NotFound)?;
        if latest.track_id != expected {
            return Err(StoreError::stale_write(format!(
                "latest entry for {uid} is {}, caller expected {}",
                latest.track_id.value(),
                expected.value()
            )));
        }
        Ok(latest.clone())
    }
}

#[async_trait]
impl WarehouseStore for InMemoryStore {
    async fn insert_contribution(&self, contribution: Contribution) -> Result<(), StoreError> {
        let mut state = self.inner.write().map_err(Self::lock_err)?;
        if state.contributions.contains_key(&contribution.id) {
            return Err(StoreError::conflict("contribution id already exists"));
        }
        state.contributions.insert(contribution.id, contribution);
        Ok(())
    }

    async fn get_contribution(
        &self,
        id: ContributionId,
    ) -> Result<Option<Contribution>, StoreError> {
        let state = self.inner.read().map_err(Self::lock_err)?;
        Ok(state.contributions.get(&id).cloned())
    }

    async fn list_contributions(
        &self,
        status: Option<ContributionStatus>,
    ) -> Result<Vec<Contribution>, StoreError> {
        let state = self.inner.read().map_err(Self::lock_err)?;
        let mut out: Vec<Contribution> = state
            .contributions
            .values()
            .filter(|c| status.is_none_or(|s| c.status == s))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(out)
    }

    async fn reject_contribution(
        &self,
        id: ContributionId,
        remark: Option<String>,
    ) -> Result<Uid, StoreError> {
        let mut state = self.inner.write().map_err(Self::lock_err)?;
        let contribution = state.contributions.get_mut(&id).ok_or(StoreError::NotFound)?;
        if contribution.status != ContributionStatus::Pending {
            return Err(StoreError::conflict(format!(
                "contribution {} already decided",
                contribution.uid
            )));
        }
        contribution.status = ContributionStatus::Rejected;
        contribution.admin_remark = remark;
        Ok(contribution.uid.clone())
    }

    async fn approve_and_materialize(
        &self,
        id: ContributionId,
        item: InventoryItem,
        seed: NewTrackingEvent,
        remark: Option<String>,
    ) -> Result<TrackingEvent, StoreError> {
        let mut state = self.inner.write().map_err(Self::lock_err)?;

        let contribution = state.contributions.get(&id).ok_or(StoreError::NotFound)?;
        if contribution.status != ContributionStatus::Pending {
            return Err(StoreError::conflict(format!(
                "contribution {} already decided",
                contribution.uid
            )));
        }
        if item.uid != seed.uid {
            return Err(StoreError::storage("seed event uid does not match item uid"));
        }
        if state.items.iter().any(|i| i.uid == item.uid) {
            return Err(StoreError::conflict(format!(
                "inventory item for {} already exists",
                item.uid
            )));
        }

        {
            let contribution = state
                .contributions
                .get_mut(&id)
                .ok_or(StoreError::NotFound)?;
            contribution.status = ContributionStatus::Approved;
            contribution.admin_remark = remark;
        }
        state.items.push(item);

        // Simulated crash between the item insert and the seed insert. The
        // staged writes are undone, matching a transaction rollback.
        #[cfg(test)]
        if self
            .fail_before_seed
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            state.items.pop();
            if let Some(contribution) = state.contributions.get_mut(&id) {
                contribution.status = ContributionStatus::Pending;
                contribution.admin_remark = None;
            }
            return Err(StoreError::storage("injected failure before seed insert"));
        }

        Ok(Self::push_event(&mut state, seed))
    }

    async fn get_item_by_uid(&self, uid: &Uid) -> Result<Option<InventoryItem>, StoreError> {
        let state = self.inner.read().map_err(Self::lock_err)?;
        Ok(state.items.iter().find(|i| &i.uid == uid).cloned())
    }

    async fn list_items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        let state = self.inner.read().map_err(Self::lock_err)?;
        let mut out = state.items.clone();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn latest_event(&self, uid: &Uid) -> Result<Option<TrackingEvent>, StoreError> {
        let state = self.inner.read().map_err(Self::lock_err)?;
        let events: Vec<TrackingEvent> = state
            .events
            .iter()
            .filter(|e| &e.uid == uid)
            .cloned()
            .collect();
        Ok(latest_by_track_id(&events).cloned())
    }

    async fn append_event(
        &self,
        event: NewTrackingEvent,
        expected_latest: TrackId,
        item_update: Option<ItemStateUpdate>,
    ) -> Result<TrackingEvent, StoreError> {
        let mut state = self.inner.write().map_err(Self::lock_err)?;
        Self::check_latest(&state, &event.uid, expected_latest)?;
        let uid = event.uid.clone();
        let stored = Self::push_event(&mut state, event);
        if let Some(update) = item_update {
            Self::apply_item_update(&mut state, &uid, &update);
        }
        Ok(stored)
    }

    async fn correct_latest(
        &self,
        uid: &Uid,
        expected_latest: TrackId,
        patch: EventPatch,
        item_update: Option<ItemStateUpdate>,
    ) -> Result<TrackingEvent, StoreError> {
        let mut state = self.inner.write().map_err(Self::lock_err)?;
        let latest = Self::check_latest(&state, uid, expected_latest)?;
        let event = state
            .events
            .iter_mut()
            .find(|e| e.track_id == latest.track_id)
            .ok_or(StoreError::NotFound)?;
        event.apply_patch(&patch);
        let patched = event.clone();
        if let Some(update) = item_update {
            Self::apply_item_update(&mut state, uid, &update);
        }
        Ok(patched)
    }

    async fn timeline(&self, uid: &Uid) -> Result<Vec<TrackingEvent>, StoreError> {
        let state = self.inner.read().map_err(Self::lock_err)?;
        let mut events: Vec<TrackingEvent> = state
            .events
            .iter()
            .filter(|e| &e.uid == uid)
            .cloned()
            .collect();
        sort_timeline(&mut events);
        Ok(events)
    }

    async fn latest_per_uid(&self) -> Result<Vec<TrackingEvent>, StoreError> {
        let state = self.inner.read().map_err(Self::lock_err)?;
        let mut latest: HashMap<Uid, TrackingEvent> = HashMap::new();
        for event in &state.events {
            match latest.get(&event.uid) {
                Some(existing) if existing.track_id >= event.track_id => {}
                _ => {
                    latest.insert(event.uid.clone(), event.clone());
                }
            }
        }
        let mut out: Vec<TrackingEvent> = latest.into_values().collect();
        out.sort_by(|a, b| b.track_id.cmp(&a.track_id));
        Ok(out)
    }
}
