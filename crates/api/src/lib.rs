//! `reliefstock-api`
//!
//! HTTP surface for the relief warehouse: contribution intake and decisions,
//! inventory reads, the perishables view and the shipment tracking ledger.

pub mod app;
