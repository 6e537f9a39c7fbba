//! Shipments domain module (supplier deliveries, event-sourced).
//!
//! This crate contains the shipment lifecycle (`Scheduled -> Confirmed ->
//! Verified`), the manifest reconciliation rules and the per-store ledger,
//! implemented purely as deterministic domain logic (no IO, no storage).

pub mod ledger;
pub mod manifest;
pub mod shipment;

pub use ledger::StoreLedgers;
pub use manifest::{reconcile, ManifestLine, ReceivedQuantities, ReconciledLine};
pub use shipment::{
    AddItem, ConfirmShipment, LineRestocked, ManifestLineSet, RecordLineRestock, ScheduleShipment,
    Shipment, ShipmentCommand, ShipmentConfirmed, ShipmentEvent, ShipmentId, ShipmentScheduled,
    ShipmentStatus, ShipmentVerified, VerifyShipment,
};
