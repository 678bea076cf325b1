//! `reliefstock-contributions`
//!
//! **Responsibility:** the contribution intake model: the three contribution
//! variants, their pending/approved/rejected status machine, and the decision
//! type consumed by the materialization pipeline.

pub mod contribution;

pub use contribution::{
    Contribution, ContributionKind, ContributionStatus, Decision,
};
