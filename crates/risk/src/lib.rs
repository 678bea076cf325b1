//! `reliefstock-risk`
//!
//! **Responsibility:** advisory product risk assessment boundary.
//!
//! This crate is intentionally **not** part of the domain model:
//! - It must not mutate domain state.
//! - Its output is purely informative; the materialization pipeline behaves
//!   identically whether or not an assessor is present.

pub mod assessor;

pub use assessor::{RiskAdvisory, RiskAssessor, RiskVerdict, RuleBasedAssessor};
