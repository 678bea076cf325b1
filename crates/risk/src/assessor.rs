use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use reliefstock_contributions::{Contribution, ContributionKind};

/// Advisory verdict. Never consulted for control flow by the pipeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskVerdict {
    Approve,
    Review,
    Reject,
}

/// Result of a risk assessment.
///
/// This is an insight for the reviewing admin, not a decision: materialization
/// proceeds on the admin's decision alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAdvisory {
    pub verdict: RiskVerdict,
    /// Confidence in \[0, 100\].
    pub confidence: u8,
    pub reason: String,
}

impl RiskAdvisory {
    pub fn new(verdict: RiskVerdict, confidence: u8, reason: impl Into<String>) -> Self {
        Self {
            verdict,
            confidence,
            reason: reason.into(),
        }
    }

    /// Fallback when no assessor is wired in or the assessor failed.
    /// Degrades to "needs human review" rather than blocking anything.
    pub fn neutral() -> Self {
        Self::new(RiskVerdict::Review, 50, "no assessment available")
    }
}

/// Pure assessment boundary.
///
/// `as_of` is the calendar date to judge expiry against, passed in so
/// assessments stay deterministic under test.
pub trait RiskAssessor: Send + Sync {
    fn assess(&self, contribution: &Contribution, as_of: NaiveDate) -> RiskAdvisory;
}

/// Category-aware rule set.
///
/// Clothing and low-risk goods (books, utensils, toys) lean approve; food
/// always needs a human look and is hard-rejected when expired; everything
/// unknown lands in review.
#[derive(Debug, Default, Clone)]
pub struct RuleBasedAssessor;

impl RuleBasedAssessor {
    pub fn new() -> Self {
        Self
    }

    fn assess_product(
        &self,
        category: &str,
        perishable: bool,
        expiry_date: Option<NaiveDate>,
        as_of: NaiveDate,
    ) -> RiskAdvisory {
        let category = category.to_lowercase();

        if ["saree", "cloth", "dress", "shirt"]
            .iter()
            .any(|c| category.contains(c))
        {
            return RiskAdvisory::new(RiskVerdict::Approve, 85, "clothing donation, low risk");
        }

        if ["food", "rice", "grain"].iter().any(|c| category.contains(c)) {
            if !perishable {
                return RiskAdvisory::new(
                    RiskVerdict::Review,
                    60,
                    "food item not marked perishable",
                );
            }
            return match expiry_date {
                None => RiskAdvisory::new(RiskVerdict::Reject, 90, "missing expiry date"),
                Some(expiry) if expiry <= as_of => {
                    RiskAdvisory::new(RiskVerdict::Reject, 95, "expired food item")
                }
                Some(_) => RiskAdvisory::new(
                    RiskVerdict::Review,
                    75,
                    "food item requires manual verification",
                ),
            };
        }

        if ["book", "utensil", "toy"].iter().any(|c| category.contains(c)) {
            return RiskAdvisory::new(RiskVerdict::Approve, 90, "low-risk item category");
        }

        RiskAdvisory::new(RiskVerdict::Review, 65, "unknown category, requires admin validation")
    }
}

impl RiskAssessor for RuleBasedAssessor {
    fn assess(&self, contribution: &Contribution, as_of: NaiveDate) -> RiskAdvisory {
        match &contribution.kind {
            ContributionKind::MoneyDonation { .. } => RiskAdvisory::new(
                RiskVerdict::Approve,
                80,
                "monetary contribution, no physical inspection needed",
            ),
            ContributionKind::PhysicalProduct {
                category,
                perishable,
                expiry_date,
                ..
            } => self.assess_product(category, *perishable, *expiry_date, as_of),
            ContributionKind::DisasterRequest { .. } => RiskAdvisory::new(
                RiskVerdict::Review,
                70,
                "disaster request, verify against relief registry",
            ),
        }
    }
}
