//! Contribution intake and the approval pipeline.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};

use reliefstock_contributions::{Contribution, ContributionKind, ContributionStatus, Decision};
use reliefstock_core::{ContributionId, InventoryId, Uid};
use reliefstock_inventory::InventoryItem;
use reliefstock_risk::{RiskAdvisory, RiskAssessor};
use reliefstock_tracking::NewTrackingEvent;

use crate::error::ServiceError;
use crate::store::WarehouseStore;

/// What a decision produced. `inventory_id` is present only on approval.
#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub uid: Uid,
    pub status: ContributionStatus,
    pub inventory_id: Option<InventoryId>,
    pub advisory: RiskAdvisory,
}

/// Turns pending contributions into warehouse inventory.
///
/// The assessor is optional and purely advisory: its verdict is logged and
/// returned alongside the outcome, never enforced.
pub struct Materializer<S> {
    store: S,
    assessor: Option<Arc<dyn RiskAssessor>>,
}

impl<S: WarehouseStore> Materializer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            assessor: None,
        }
    }

    pub fn with_assessor(mut self, assessor: Arc<dyn RiskAssessor>) -> Self {
        self.assessor = Some(assessor);
        self
    }

    /// Registers a new pending contribution and assigns its UID.
    #[instrument(skip_all)]
    pub async fn submit(&self, kind: ContributionKind) -> Result<Contribution, ServiceError> {
        let contribution = Contribution::submit(kind, Utc::now())?;
        self.store.insert_contribution(contribution.clone()).await?;
        info!(uid = %contribution.uid, "contribution submitted");
        Ok(contribution)
    }

    pub async fn get(&self, id: ContributionId) -> Result<Contribution, ServiceError> {
        self.store
            .get_contribution(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("contribution not found"))
    }

    pub async fn list(
        &self,
        status: Option<ContributionStatus>,
    ) -> Result<Vec<Contribution>, ServiceError> {
        Ok(self.store.list_contributions(status).await?)
    }

    /// Applies an admin decision exactly once.
    ///
    /// Approval materializes atomically: status flip, inventory item and seed
    /// tracking event commit together. Rejection only flips the status. Both
    /// paths fail with `Conflict` when the contribution was already decided.
    #[instrument(skip_all, fields(contribution_id = %id, decision = ?decision))]
    pub async fn decide(
        &self,
        id: ContributionId,
        decision: Decision,
        remark: Option<String>,
    ) -> Result<DecisionOutcome, ServiceError> {
        let contribution = self
            .store
            .get_contribution(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("contribution not found"))?;

        let advisory = self
            .assessor
            .as_deref()
            .map(|a| a.assess(&contribution, Utc::now().date_naive()))
            .unwrap_or_else(RiskAdvisory::neutral);
        info!(
            uid = %contribution.uid,
            verdict = ?advisory.verdict,
            confidence = advisory.confidence,
            reason = %advisory.reason,
            "risk advisory"
        );

        match decision {
            Decision::Rejected => {
                let uid = self.store.reject_contribution(id, remark).await?;
                info!(uid = %uid, "contribution rejected");
                Ok(DecisionOutcome {
                    uid,
                    status: ContributionStatus::Rejected,
                    inventory_id: None,
                    advisory,
                })
            }
            Decision::Approved => {
                let now = Utc::now();
                // Validation happens before any store mutation.
                let item = InventoryItem::materialize(&contribution, now)?;
                let seed = NewTrackingEvent::seed(item.uid.clone(), now);
                let inventory_id = item.inventory_id;
                self.store
                    .approve_and_materialize(id, item, seed, remark)
                    .await?;
                info!(uid = %contribution.uid, inventory_id = %inventory_id, "contribution materialized");
                Ok(DecisionOutcome {
                    uid: contribution.uid,
                    status: ContributionStatus::Approved,
                    inventory_id: Some(inventory_id),
                    advisory,
                })
            }
        }
    }
}
