//! In-memory supplier registry.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use retailops_core::{Aggregate, AggregateId, DomainError, DomainResult};

use crate::supplier::{
    RecordShipmentOutcome, RegisterSupplier, Supplier, SupplierCommand, SupplierEvent, SupplierId,
};

/// Holds every known supplier for the session.
///
/// Suppliers are added once (at load time) and afterwards only their
/// performance counters change, through [`SupplierRegistry::record_shipment_outcome`].
#[derive(Debug, Default, Clone)]
pub struct SupplierRegistry {
    suppliers: HashMap<SupplierId, Supplier>,
}

impl SupplierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new supplier. Duplicate ids are a conflict.
    pub fn register(&mut self, cmd: RegisterSupplier) -> DomainResult<Vec<SupplierEvent>> {
        if self.suppliers.contains_key(&cmd.supplier_id) {
            return Err(DomainError::conflict(format!(
                "supplier {} already exists",
                cmd.supplier_id
            )));
        }

        let supplier_id = cmd.supplier_id.clone();
        let mut supplier = Supplier::empty(supplier_id.clone());
        let events = supplier.execute(&SupplierCommand::RegisterSupplier(cmd))?;
        self.suppliers.insert(supplier_id, supplier);
        Ok(events)
    }

    pub fn exists(&self, supplier_id: &SupplierId) -> bool {
        self.suppliers.contains_key(supplier_id)
    }

    pub fn get(&self, supplier_id: &SupplierId) -> DomainResult<&Supplier> {
        self.suppliers
            .get(supplier_id)
            .ok_or_else(|| DomainError::not_found(format!("supplier {supplier_id}")))
    }

    /// Point-in-time copy of every supplier's rating, ordered by id.
    pub fn ratings_snapshot(&self) -> BTreeMap<SupplierId, f64> {
        self.suppliers
            .iter()
            .map(|(id, supplier)| (id.clone(), supplier.rating()))
            .collect()
    }

    /// Count one verified shipment against the supplier and recompute its rating.
    ///
    /// Unknown suppliers are reported as `NotFound` and nothing changes.
    pub fn record_shipment_outcome(
        &mut self,
        supplier_id: &SupplierId,
        shipment_id: AggregateId,
        had_discrepancy: bool,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Vec<SupplierEvent>> {
        let supplier = self
            .suppliers
            .get_mut(supplier_id)
            .ok_or_else(|| DomainError::not_found(format!("supplier {supplier_id}")))?;

        supplier.execute(&SupplierCommand::RecordShipmentOutcome(
            RecordShipmentOutcome {
                supplier_id: supplier_id.clone(),
                shipment_id,
                had_discrepancy,
                occurred_at,
            },
        ))
    }

    pub fn len(&self) -> usize {
        self.suppliers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suppliers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Supplier> {
        self.suppliers.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supplier::{ContactInfo, MAX_RATING};

    fn sid(code: &str) -> SupplierId {
        SupplierId::parse(code).unwrap()
    }

    fn register_cmd(code: &str, name: &str) -> RegisterSupplier {
        RegisterSupplier {
            supplier_id: sid(code),
            name: name.to_string(),
            contact: ContactInfo::default(),
            occurred_at: Utc::now(),
        }
    }

    fn registry_with(codes: &[&str]) -> SupplierRegistry {
        let mut registry = SupplierRegistry::new();
        for code in codes {
            registry.register(register_cmd(code, "Supplier")).unwrap();
        }
        registry
    }

    #[test]
    fn register_then_lookup() {
        let registry = registry_with(&["S1"]);
        assert!(registry.exists(&sid("S1")));
        assert!(!registry.exists(&sid("S2")));
        assert_eq!(registry.get(&sid("S1")).unwrap().rating(), MAX_RATING);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_registration_is_a_conflict() {
        let mut registry = registry_with(&["S1"]);
        match registry.register(register_cmd("S1", "Other")).unwrap_err() {
            DomainError::Conflict(_) => {}
            other => panic!("Expected Conflict, got {other:?}"),
        }
        assert_eq!(registry.get(&sid("S1")).unwrap().name(), "Supplier");
    }

    #[test]
    fn get_unknown_supplier_is_not_found() {
        let registry = SupplierRegistry::new();
        assert!(registry.get(&sid("S404")).unwrap_err().is_not_found());
    }

    #[test]
    fn record_outcome_for_unknown_supplier_is_not_found_and_changes_nothing() {
        let mut registry = registry_with(&["S1"]);
        let before = registry.ratings_snapshot();

        let err = registry
            .record_shipment_outcome(&sid("S2"), AggregateId::new(), true, Utc::now())
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(registry.ratings_snapshot(), before);
    }

    #[test]
    fn ratings_snapshot_is_a_point_in_time_copy() {
        let mut registry = registry_with(&["S1", "S2"]);
        let snapshot = registry.ratings_snapshot();

        registry
            .record_shipment_outcome(&sid("S1"), AggregateId::new(), true, Utc::now())
            .unwrap();

        assert_eq!(snapshot[&sid("S1")], MAX_RATING);
        assert_eq!(registry.ratings_snapshot()[&sid("S1")], 0.0);
        assert_eq!(registry.ratings_snapshot()[&sid("S2")], MAX_RATING);
    }

    #[test]
    fn record_outcome_returns_the_applied_event() {
        let mut registry = registry_with(&["S1"]);
        let shipment_id = AggregateId::new();
        let events = registry
            .record_shipment_outcome(&sid("S1"), shipment_id, false, Utc::now())
            .unwrap();

        match &events[..] {
            [SupplierEvent::ShipmentOutcomeRecorded(e)] => {
                assert_eq!(e.shipment_id, shipment_id);
                assert!(!e.had_discrepancy);
                assert_eq!(e.performance.total_shipments(), 1);
            }
            other => panic!("Expected one ShipmentOutcomeRecorded, got {other:?}"),
        }
    }
}
