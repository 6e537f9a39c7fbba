//! Receiving and reconciliation orchestration.
//!
//! The service owns the supplier registry, the per-store shipment ledgers and
//! the audit log, and drives the two collaborators (catalog and inventory):
//!
//! ```text
//! create_shipment -> add_item* -> confirm_shipment? -> verify_shipment
//!                                                        |
//!                      reconcile manifest vs. received <-+
//!                      restock every line (received qty)
//!                      flip to VERIFIED, stamp delivery time
//!                      rate supplier on the outcome
//! ```
//!
//! Mutating operations take `&mut self`; share the service across threads by
//! wrapping it in a `Mutex`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use retailops_core::{Aggregate, DomainError, StoreId};
use retailops_events::{Event, EventEnvelope};
use retailops_inventory::StockItemId;
use retailops_products::ProductId;
use retailops_shipments::{
    AddItem, ConfirmShipment, ReceivedQuantities, ReconciledLine, RecordLineRestock,
    ScheduleShipment, Shipment, ShipmentCommand, ShipmentEvent, ShipmentId, ShipmentVerified,
    StoreLedgers, VerifyShipment,
};
use retailops_suppliers::{Supplier, SupplierId, SupplierRegistry};

use crate::audit::AuditLog;
use crate::collaborators::{ProductCatalog, StockRestocker};
use crate::config::ReconciliationConfig;
use crate::error::ReconciliationError;
use crate::supplier_file::SupplierRecord;

const SHIPMENT_STREAM: &str = "shipments.shipment";
const SUPPLIER_STREAM: &str = "suppliers.supplier";

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub shipment_id: ShipmentId,
    pub store_id: StoreId,
    pub supplier_id: SupplierId,
    /// One entry per manifest line, in manifest order.
    pub lines: Vec<ReconciledLine>,
    /// Counted products that were not on the manifest.
    pub unexpected: Vec<ProductId>,
    pub delivered_at: DateTime<Utc>,
}

impl VerificationReport {
    /// `true` when every line was received exactly as expected.
    pub fn is_clean(&self) -> bool {
        !self.had_discrepancy()
    }

    pub fn had_discrepancy(&self) -> bool {
        self.lines.iter().any(ReconciledLine::is_discrepant)
    }

    /// Lines where the received count differs from the manifest.
    pub fn discrepancies(&self) -> impl Iterator<Item = &ReconciledLine> {
        self.lines.iter().filter(|line| line.is_discrepant())
    }
}

impl From<&ShipmentVerified> for VerificationReport {
    fn from(event: &ShipmentVerified) -> Self {
        Self {
            shipment_id: event.shipment_id,
            store_id: event.store_id.clone(),
            supplier_id: event.supplier_id.clone(),
            lines: event.lines.clone(),
            unexpected: event.unexpected.clone(),
            delivered_at: event.occurred_at,
        }
    }
}

pub struct ReconciliationService<C, R> {
    config: ReconciliationConfig,
    suppliers: SupplierRegistry,
    ledgers: StoreLedgers,
    catalog: C,
    inventory: R,
    audit: AuditLog,
}

impl<C, R> ReconciliationService<C, R>
where
    C: ProductCatalog,
    R: StockRestocker,
{
    /// Build a service starting in the configured initial store.
    pub fn new(
        config: ReconciliationConfig,
        suppliers: SupplierRegistry,
        catalog: C,
        inventory: R,
    ) -> Result<Self, ReconciliationError> {
        let initial_store = config.initial_store_id()?;
        Ok(Self {
            config,
            suppliers,
            ledgers: StoreLedgers::new(initial_store),
            catalog,
            inventory,
            audit: AuditLog::new(),
        })
    }

    pub fn register_supplier(&mut self, record: SupplierRecord) -> Result<(), ReconciliationError> {
        let supplier_id = record.supplier_id.clone();
        let events = self.suppliers.register(record.into_command(Utc::now()))?;
        self.audit(supplier_id.as_str(), SUPPLIER_STREAM, &events);
        tracing::debug!(supplier = %supplier_id, "supplier registered");
        Ok(())
    }

    /// Register every record, stopping at the first failure.
    pub fn register_suppliers(
        &mut self,
        records: impl IntoIterator<Item = SupplierRecord>,
    ) -> Result<usize, ReconciliationError> {
        let mut registered = 0;
        for record in records {
            self.register_supplier(record)?;
            registered += 1;
        }
        Ok(registered)
    }

    pub fn current_store(&self) -> &StoreId {
        self.ledgers.current_store()
    }

    /// Switch the store that shipment operations address.
    pub fn set_current_store(&mut self, store_id: StoreId) {
        tracing::debug!(store = %store_id, "store context switched");
        self.ledgers.set_current_store(store_id);
    }

    /// Schedule a new shipment from `supplier_id` into the current store.
    pub fn create_shipment(
        &mut self,
        supplier_id: &SupplierId,
        scheduled_at: DateTime<Utc>,
    ) -> Result<&Shipment, ReconciliationError> {
        if !self.suppliers.exists(supplier_id) {
            return Err(DomainError::not_found(format!("supplier {supplier_id}")).into());
        }

        let shipment_id = ShipmentId::generate();
        let mut shipment = Shipment::empty(shipment_id);
        let events = shipment.execute(&ShipmentCommand::ScheduleShipment(ScheduleShipment {
            shipment_id,
            store_id: self.ledgers.current_store().clone(),
            supplier_id: supplier_id.clone(),
            scheduled_at,
            occurred_at: Utc::now(),
        }))?;

        self.ledgers.append(shipment)?;
        self.audit(&shipment_id.to_string(), SHIPMENT_STREAM, &events);
        tracing::info!(
            shipment = %shipment_id,
            supplier = %supplier_id,
            store = %self.ledgers.current_store(),
            "shipment scheduled"
        );

        Ok(self.ledgers.require(&shipment_id)?)
    }

    /// Set the expected quantity of a catalog product on the manifest.
    pub fn add_item(
        &mut self,
        shipment_id: ShipmentId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<(), ReconciliationError> {
        self.ledgers.require(&shipment_id)?;
        if !self.catalog.contains(product_id) {
            return Err(DomainError::not_found(format!("product {product_id}")).into());
        }

        let command = ShipmentCommand::AddItem(AddItem {
            shipment_id,
            product_id: product_id.clone(),
            quantity,
            occurred_at: Utc::now(),
        });
        let events = self.execute_on(shipment_id, &command)?;

        if let Some(ShipmentEvent::ManifestLineSet(e)) = events.first() {
            if let Some(previous) = e.replaced {
                tracing::debug!(
                    shipment = %shipment_id,
                    product = %product_id,
                    previous,
                    quantity,
                    "manifest quantity overwritten"
                );
            }
        }
        Ok(())
    }

    pub fn confirm_shipment(&mut self, shipment_id: ShipmentId) -> Result<(), ReconciliationError> {
        self.ledgers.require(&shipment_id)?;
        let command = ShipmentCommand::ConfirmShipment(ConfirmShipment {
            shipment_id,
            occurred_at: Utc::now(),
        });
        self.execute_on(shipment_id, &command)?;
        tracing::info!(shipment = %shipment_id, "shipment confirmed");
        Ok(())
    }

    /// Reconcile a delivery against its manifest.
    ///
    /// Every manifest line is restocked by the quantity actually received
    /// (zero when the product was not counted). Each restocked line is
    /// recorded on the shipment, so a restock failure aborts the loop with the
    /// shipment unverified and the supplier unrated, and a later retry resumes
    /// at the first line that has not reached inventory yet.
    pub fn verify_shipment(
        &mut self,
        shipment_id: ShipmentId,
        received: ReceivedQuantities,
    ) -> Result<VerificationReport, ReconciliationError> {
        let shipment = self.ledgers.require(&shipment_id)?;
        let events = shipment.handle(&ShipmentCommand::VerifyShipment(VerifyShipment {
            shipment_id,
            received,
            require_confirmation: self.config.require_confirmation,
            occurred_at: Utc::now(),
        }))?;

        let report = match events.first() {
            Some(ShipmentEvent::ShipmentVerified(verified)) => VerificationReport::from(verified),
            _ => {
                return Err(DomainError::invariant("verification produced no outcome").into());
            }
        };

        // Rating an unknown supplier would fail after stock was touched.
        if !self.suppliers.exists(&report.supplier_id) {
            return Err(DomainError::not_found(format!("supplier {}", report.supplier_id)).into());
        }

        for line in &report.lines {
            if line.is_discrepant() {
                tracing::warn!(
                    shipment = %shipment_id,
                    product = %line.product_id,
                    expected = line.expected,
                    received = line.received,
                    difference = line.difference(),
                    "shipment discrepancy"
                );
            }

            let already_restocked = self
                .ledgers
                .get(&shipment_id)
                .and_then(|shipment| shipment.restocked_quantity(&line.product_id))
                .is_some();
            if already_restocked {
                tracing::debug!(
                    shipment = %shipment_id,
                    product = %line.product_id,
                    "line restocked by an earlier attempt skipped"
                );
                continue;
            }

            let item_id = StockItemId::new(report.store_id.clone(), line.product_id.clone());
            self.inventory
                .restock(&item_id, line.received, shipment_id, report.delivered_at)
                .map_err(|source| ReconciliationError::Restock {
                    product_id: line.product_id.clone(),
                    source,
                })?;

            let progress = ShipmentCommand::RecordLineRestock(RecordLineRestock {
                shipment_id,
                product_id: line.product_id.clone(),
                quantity: line.received,
                occurred_at: report.delivered_at,
            });
            self.execute_on(shipment_id, &progress)?;
        }

        for product_id in &report.unexpected {
            tracing::debug!(
                shipment = %shipment_id,
                product = %product_id,
                "received product not on manifest ignored"
            );
        }

        self.apply_on(shipment_id, &events)?;

        let supplier_events = self.suppliers.record_shipment_outcome(
            &report.supplier_id,
            shipment_id.0,
            report.had_discrepancy(),
            report.delivered_at,
        )?;
        self.audit(report.supplier_id.as_str(), SUPPLIER_STREAM, &supplier_events);

        tracing::info!(
            shipment = %shipment_id,
            supplier = %report.supplier_id,
            clean = report.is_clean(),
            lines = report.lines.len(),
            "shipment verified"
        );
        Ok(report)
    }

    /// Unverified shipments of the current store, in scheduling order.
    pub fn pending_shipments(&self) -> Vec<&Shipment> {
        self.ledgers.pending().collect()
    }

    pub fn shipment(&self, shipment_id: ShipmentId) -> Result<&Shipment, ReconciliationError> {
        Ok(self.ledgers.require(&shipment_id)?)
    }

    /// Every shipment of the current store, in scheduling order.
    pub fn shipments(&self) -> &[Shipment] {
        self.ledgers.shipments()
    }

    pub fn supplier(&self, supplier_id: &SupplierId) -> Result<&Supplier, ReconciliationError> {
        Ok(self.suppliers.get(supplier_id)?)
    }

    pub fn ratings_snapshot(&self) -> BTreeMap<SupplierId, f64> {
        self.suppliers.ratings_snapshot()
    }

    /// Recorded events of one shipment or supplier stream, oldest first.
    pub fn audit_trail(&self, stream_id: &str) -> &[EventEnvelope<serde_json::Value>] {
        self.audit.stream(stream_id)
    }

    pub fn suppliers(&self) -> &SupplierRegistry {
        &self.suppliers
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn inventory(&self) -> &R {
        &self.inventory
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    fn execute_on(
        &mut self,
        shipment_id: ShipmentId,
        command: &ShipmentCommand,
    ) -> Result<Vec<ShipmentEvent>, ReconciliationError> {
        let shipment = self.ledgers.get_mut(&shipment_id).ok_or_else(|| {
            DomainError::not_found(format!("shipment {shipment_id}"))
        })?;
        let events = shipment.execute(command)?;
        self.audit(&shipment_id.to_string(), SHIPMENT_STREAM, &events);
        Ok(events)
    }

    /// Apply already-decided events; the shipment must still be on the ledger.
    fn apply_on(
        &mut self,
        shipment_id: ShipmentId,
        events: &[ShipmentEvent],
    ) -> Result<(), ReconciliationError> {
        let shipment = self.ledgers.get_mut(&shipment_id).ok_or_else(|| {
            DomainError::invariant(format!("shipment {shipment_id} left the ledger mid-operation"))
        })?;
        for event in events {
            shipment.apply(event);
        }
        self.audit(&shipment_id.to_string(), SHIPMENT_STREAM, events);
        Ok(())
    }

    /// Audit failures never undo an applied change; they are logged.
    fn audit<E>(&mut self, stream_id: &str, stream_type: &str, events: &[E])
    where
        E: Event + Serialize,
    {
        let store_id = self.ledgers.current_store().clone();
        if let Err(err) = self.audit.record(&store_id, stream_id, stream_type, events) {
            tracing::error!(stream = stream_id, error = %err, "failed to record audit events");
        }
    }
}
