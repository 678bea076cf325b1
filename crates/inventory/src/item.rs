use chrono::{DateTime, NaiveDate, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use reliefstock_contributions::{Contribution, ContributionKind};
use reliefstock_core::{ContributionId, DomainError, DomainResult, InventoryId, Uid};

/// Location every materialized item starts in.
pub const MAIN_WAREHOUSE: &str = "Main Warehouse";

/// Which contribution variant an inventory item was materialized from.
///
/// The tag governs which optional fields are meaningful: `money` carries
/// amount/method and nothing physical; `product` and `disaster` carry the
/// physical fields and no amount/method.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Money,
    Product,
    Disaster,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Money => "money",
            SourceType::Product => "product",
            SourceType::Disaster => "disaster",
        }
    }
}

impl FromStr for SourceType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "money" => Ok(SourceType::Money),
            "product" => Ok(SourceType::Product),
            "disaster" => Ok(SourceType::Disaster),
            other => Err(DomainError::validation(format!(
                "unknown source type '{other}'"
            ))),
        }
    }
}

/// Warehouse-level status, derived from ledger activity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Received,
    Dispatched,
    Delivered,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Received => "received",
            ItemStatus::Dispatched => "dispatched",
            ItemStatus::Delivered => "delivered",
        }
    }
}

impl FromStr for ItemStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "received" => Ok(ItemStatus::Received),
            "dispatched" => Ok(ItemStatus::Dispatched),
            "delivered" => Ok(ItemStatus::Delivered),
            other => Err(DomainError::validation(format!(
                "unknown item status '{other}'"
            ))),
        }
    }
}

/// Canonical warehouse record, created exactly once per approved
/// contribution.
///
/// Never deleted; `location` and `status` change only through the tracking
/// ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub inventory_id: InventoryId,
    pub source_type: SourceType,
    pub source_id: ContributionId,
    /// Copied from the contribution; the identity the ledger is keyed by.
    pub uid: Uid,
    pub product_name: Option<String>,
    pub quantity: Option<i64>,
    pub unit: Option<String>,
    pub location: String,
    pub status: ItemStatus,
    pub perishable: bool,
    pub manufacture_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub amount: Option<i64>,
    pub method: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Project an approved contribution into its inventory record.
    ///
    /// | source   | product_name   | quantity/unit | perishable/dates | amount/method |
    /// |----------|----------------|---------------|------------------|---------------|
    /// | money    | -              | -             | -                | copied        |
    /// | product  | copied         | copied        | copied           | -             |
    /// | disaster | requested_item | copied        | -                | -             |
    ///
    /// Fails with `Validation` (before any store mutation) when a perishable
    /// product is missing its expiry date.
    pub fn materialize(contribution: &Contribution, now: DateTime<Utc>) -> DomainResult<Self> {
        let base = Self {
            inventory_id: InventoryId::new(),
            source_type: SourceType::Money,
            source_id: contribution.id,
            uid: contribution.uid.clone(),
            product_name: None,
            quantity: None,
            unit: None,
            location: MAIN_WAREHOUSE.to_string(),
            status: ItemStatus::Received,
            perishable: false,
            manufacture_date: None,
            expiry_date: None,
            amount: None,
            method: None,
            created_at: now,
        };

        match &contribution.kind {
            ContributionKind::MoneyDonation { amount, method } => Ok(Self {
                source_type: SourceType::Money,
                amount: Some(*amount),
                method: Some(method.clone()),
                ..base
            }),
            ContributionKind::PhysicalProduct {
                product_name,
                quantity,
                unit,
                perishable,
                manufacture_date,
                expiry_date,
                ..
            } => {
                if *perishable && expiry_date.is_none() {
                    return Err(DomainError::validation(
                        "perishable products require an expiry date",
                    ));
                }
                Ok(Self {
                    source_type: SourceType::Product,
                    product_name: Some(product_name.clone()),
                    quantity: Some(*quantity),
                    unit: Some(unit.clone()),
                    perishable: *perishable,
                    manufacture_date: *manufacture_date,
                    expiry_date: *expiry_date,
                    ..base
                })
            }
            ContributionKind::DisasterRequest {
                requested_item,
                quantity,
                unit,
                ..
            } => Ok(Self {
                source_type: SourceType::Disaster,
                product_name: Some(requested_item.clone()),
                quantity: Some(*quantity),
                unit: Some(unit.clone()),
                ..base
            }),
        }
    }
}
