use chrono::{DateTime, NaiveDate, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use reliefstock_core::{ContributionId, DomainError, DomainResult, Uid};

/// Lifecycle status of a contribution.
///
/// `Pending -> Approved` and `Pending -> Rejected` are terminal and
/// exactly-once; the store enforces the transition with a compare-and-swap.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionStatus {
    Pending,
    Approved,
    Rejected,
}

impl ContributionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionStatus::Pending => "pending",
            ContributionStatus::Approved => "approved",
            ContributionStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ContributionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ContributionStatus::Pending),
            "approved" => Ok(ContributionStatus::Approved),
            "rejected" => Ok(ContributionStatus::Rejected),
            other => Err(DomainError::validation(format!(
                "unknown contribution status '{other}'"
            ))),
        }
    }
}

/// Admin decision on a pending contribution.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

impl FromStr for Decision {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "approved" => Ok(Decision::Approved),
            "rejected" => Ok(Decision::Rejected),
            other => Err(DomainError::validation(format!(
                "decision must be 'approved' or 'rejected', got '{other}'"
            ))),
        }
    }
}

/// The three contribution variants (tagged union, not independent nullable
/// fields).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContributionKind {
    MoneyDonation {
        /// Amount in minor currency units.
        amount: i64,
        method: String,
    },
    PhysicalProduct {
        product_name: String,
        category: String,
        quantity: i64,
        unit: String,
        perishable: bool,
        manufacture_date: Option<NaiveDate>,
        expiry_date: Option<NaiveDate>,
    },
    DisasterRequest {
        requested_item: String,
        quantity: i64,
        unit: String,
        disaster_name: String,
    },
}

impl ContributionKind {
    /// UID prefix for the variant (the UID doubles as the scan code).
    pub fn uid_prefix(&self) -> &'static str {
        match self {
            ContributionKind::MoneyDonation { .. } => "DON",
            ContributionKind::PhysicalProduct { .. } => "PROD",
            ContributionKind::DisasterRequest { .. } => "DR",
        }
    }

    /// Intake validation, applied before a contribution is accepted as
    /// pending.
    pub fn validate(&self) -> DomainResult<()> {
        match self {
            ContributionKind::MoneyDonation { amount, method } => {
                if *amount <= 0 {
                    return Err(DomainError::validation("amount must be positive"));
                }
                if method.trim().is_empty() {
                    return Err(DomainError::validation("method cannot be empty"));
                }
            }
            ContributionKind::PhysicalProduct {
                product_name,
                category,
                quantity,
                unit,
                perishable,
                manufacture_date,
                expiry_date,
            } => {
                if product_name.trim().is_empty() {
                    return Err(DomainError::validation("product name cannot be empty"));
                }
                if category.trim().is_empty() {
                    return Err(DomainError::validation("category cannot be empty"));
                }
                if *quantity <= 0 {
                    return Err(DomainError::validation("quantity must be positive"));
                }
                if unit.trim().is_empty() {
                    return Err(DomainError::validation("unit cannot be empty"));
                }
                if *perishable && expiry_date.is_none() {
                    return Err(DomainError::validation(
                        "perishable products require an expiry date",
                    ));
                }
                if let (Some(m), Some(e)) = (manufacture_date, expiry_date) {
                    if m > e {
                        return Err(DomainError::validation(
                            "manufacture date cannot be after expiry date",
                        ));
                    }
                }
            }
            ContributionKind::DisasterRequest {
                requested_item,
                quantity,
                unit,
                disaster_name,
            } => {
                if requested_item.trim().is_empty() {
                    return Err(DomainError::validation("requested item cannot be empty"));
                }
                if *quantity <= 0 {
                    return Err(DomainError::validation("quantity must be positive"));
                }
                if unit.trim().is_empty() {
                    return Err(DomainError::validation("unit cannot be empty"));
                }
                if disaster_name.trim().is_empty() {
                    return Err(DomainError::validation("disaster name cannot be empty"));
                }
            }
        }
        Ok(())
    }
}

/// A pending-to-terminal request to donate money, goods, or fulfil a
/// disaster item request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub id: ContributionId,
    /// Stable external identifier; copied onto the inventory item on
    /// materialization and used as the tracking key.
    pub uid: Uid,
    pub status: ContributionStatus,
    pub kind: ContributionKind,
    /// Free-text remark recorded by the admin at decision time.
    pub admin_remark: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl Contribution {
    /// Accept a validated contribution into the pending state, generating
    /// its UID.
    pub fn submit(kind: ContributionKind, submitted_at: DateTime<Utc>) -> DomainResult<Self> {
        kind.validate()?;
        let uid = Uid::generate(kind.uid_prefix());
        Ok(Self {
            id: ContributionId::new(),
            uid,
            status: ContributionStatus::Pending,
            kind,
            admin_remark: None,
            submitted_at,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == ContributionStatus::Pending
    }
}
