//! Suppliers domain module (supplier identity and delivery performance).
//!
//! This crate contains business rules for suppliers and the in-memory registry
//! that holds them, implemented purely as deterministic domain logic (no IO,
//! no storage).

pub mod registry;
pub mod supplier;

pub use registry::SupplierRegistry;
pub use supplier::{
    ContactInfo, RecordShipmentOutcome, RegisterSupplier, ShipmentOutcomeRecorded, Supplier,
    SupplierCommand, SupplierEvent, SupplierId, SupplierPerformance, SupplierRegistered,
    MAX_RATING,
};
