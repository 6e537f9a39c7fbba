//! Integration tests for the receiving flow.
//!
//! Tests: create shipment → add items → confirm → verify → stock + rating
//!
//! Verifies:
//! - Reconciliation restocks what arrived and rates the supplier
//! - Verified shipments are final
//! - Ledgers are scoped to the current store
//! - Every applied change lands in the audit trail

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Utc};

    use retailops_core::{DomainError, DomainResult, StoreId};
    use retailops_inventory::StockItemId;
    use retailops_products::{PricingMetadata, Product, ProductId};
    use retailops_shipments::{ReceivedQuantities, ShipmentId, ShipmentStatus};
    use retailops_suppliers::{ContactInfo, SupplierId, SupplierRegistry, MAX_RATING};

    use crate::collaborators::{InMemoryInventory, InMemoryProductCatalog, StockRestocker};
    use crate::config::ReconciliationConfig;
    use crate::error::ReconciliationError;
    use crate::reconciliation::ReconciliationService;
    use crate::supplier_file::SupplierRecord;

    type Service = ReconciliationService<InMemoryProductCatalog, InMemoryInventory>;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn sid(code: &str) -> SupplierId {
        SupplierId::parse(code).unwrap()
    }

    fn pid(code: &str) -> ProductId {
        ProductId::parse(code).unwrap()
    }

    fn store(code: &str) -> StoreId {
        StoreId::parse(code).unwrap()
    }

    fn catalog() -> InMemoryProductCatalog {
        ["P1", "P2", "P3", "P4"]
            .into_iter()
            .map(|code| {
                Product::new(pid(code), format!("Product {code}"), PricingMetadata::default())
                    .unwrap()
            })
            .collect()
    }

    fn record(code: &str) -> SupplierRecord {
        SupplierRecord {
            supplier_id: sid(code),
            name: format!("Supplier {code}"),
            contact: ContactInfo {
                contact: "555-0100".to_string(),
                address: "1 Dock St".to_string(),
            },
        }
    }

    fn setup_with(config: ReconciliationConfig) -> Service {
        let mut service = ReconciliationService::new(
            config,
            SupplierRegistry::new(),
            catalog(),
            InMemoryInventory::new(),
        )
        .unwrap();
        service.register_suppliers([record("S1"), record("S2")]).unwrap();
        service
    }

    fn setup() -> Service {
        setup_with(ReconciliationConfig::default())
    }

    fn shipment_with(service: &mut Service, supplier: &str, items: &[(&str, i64)]) -> ShipmentId {
        let shipment_id = service
            .create_shipment(&sid(supplier), test_time())
            .unwrap()
            .id_typed();
        for (code, quantity) in items {
            service.add_item(shipment_id, &pid(code), *quantity).unwrap();
        }
        shipment_id
    }

    fn stock(service: &Service, code: &str) -> i64 {
        let item_id = StockItemId::new(service.current_store().clone(), pid(code));
        service.inventory().stock_level(&item_id)
    }

    fn rating(service: &Service, supplier: &str) -> f64 {
        service.supplier(&sid(supplier)).unwrap().rating()
    }

    #[test]
    fn exact_delivery_is_clean() {
        let mut service = setup();
        let shipment_id = shipment_with(&mut service, "S1", &[("P1", 10)]);

        let report = service
            .verify_shipment(shipment_id, ReceivedQuantities::new().with(pid("P1"), 10))
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(stock(&service, "P1"), 10);
        assert_eq!(rating(&service, "S1"), MAX_RATING);

        let shipment = service.shipment(shipment_id).unwrap();
        assert_eq!(shipment.status(), ShipmentStatus::Verified);
        assert_eq!(shipment.delivered_at(), Some(report.delivered_at));
    }

    #[test]
    fn short_delivery_restocks_received_and_lowers_rating() {
        let mut service = setup();
        let shipment_id = shipment_with(&mut service, "S1", &[("P1", 10)]);

        let report = service
            .verify_shipment(shipment_id, ReceivedQuantities::new().with(pid("P1"), 7))
            .unwrap();

        assert!(!report.is_clean());
        let discrepancies: Vec<_> = report.discrepancies().map(|l| l.difference()).collect();
        assert_eq!(discrepancies, vec![-3]);
        assert_eq!(stock(&service, "P1"), 7);
        assert_eq!(rating(&service, "S1"), 0.0);
    }

    #[test]
    fn duplicate_add_keeps_last_quantity() {
        let mut service = setup();
        let shipment_id = shipment_with(&mut service, "S1", &[("P2", 5), ("P2", 8)]);

        let shipment = service.shipment(shipment_id).unwrap();
        assert_eq!(shipment.manifest().len(), 1);
        assert_eq!(shipment.expected_quantity(&pid("P2")), Some(8));
    }

    #[test]
    fn uncounted_product_is_received_as_zero() {
        let mut service = setup();
        let shipment_id = shipment_with(&mut service, "S1", &[("P1", 2), ("P3", 4)]);

        let report = service
            .verify_shipment(shipment_id, ReceivedQuantities::new().with(pid("P1"), 2))
            .unwrap();

        assert!(report.had_discrepancy());
        assert_eq!(report.lines[1].received, 0);
        assert_eq!(stock(&service, "P3"), 0);

        let p3 = StockItemId::new(store("store-1"), pid("P3"));
        assert_eq!(service.inventory().restocks_of(&p3), vec![0]);
    }

    #[test]
    fn unknown_supplier_cannot_ship() {
        let mut service = setup();

        let err = service.create_shipment(&sid("S404"), test_time()).unwrap_err();
        assert!(err.is_not_found());
        assert!(service.shipments().is_empty());
    }

    #[test]
    fn unknown_product_cannot_be_added() {
        let mut service = setup();
        let shipment_id = shipment_with(&mut service, "S1", &[]);

        let err = service.add_item(shipment_id, &pid("P999"), 1).unwrap_err();
        assert!(err.is_not_found());
        assert!(service.shipment(shipment_id).unwrap().manifest().is_empty());
    }

    #[test]
    fn unknown_shipment_is_not_found() {
        let mut service = setup();
        let err = service
            .verify_shipment(ShipmentId::generate(), ReceivedQuantities::new())
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(service.inventory().events().is_empty());
    }

    #[test]
    fn second_verification_is_rejected_without_side_effects() {
        let mut service = setup();
        let shipment_id = shipment_with(&mut service, "S1", &[("P1", 10)]);
        let received = ReceivedQuantities::new().with(pid("P1"), 10);
        service.verify_shipment(shipment_id, received.clone()).unwrap();

        match service.verify_shipment(shipment_id, received).unwrap_err() {
            ReconciliationError::Conflict(_) => {}
            other => panic!("Expected Conflict, got {other:?}"),
        }
        assert_eq!(stock(&service, "P1"), 10);
        assert_eq!(
            service.supplier(&sid("S1")).unwrap().performance().total_shipments(),
            1
        );
    }

    #[test]
    fn verified_shipment_is_final() {
        let mut service = setup();
        let shipment_id = shipment_with(&mut service, "S1", &[("P1", 1)]);
        service
            .verify_shipment(shipment_id, ReceivedQuantities::new().with(pid("P1"), 1))
            .unwrap();

        match service.confirm_shipment(shipment_id).unwrap_err() {
            ReconciliationError::InvariantViolation(_) => {}
            other => panic!("Expected InvariantViolation, got {other:?}"),
        }
        match service.add_item(shipment_id, &pid("P2"), 3).unwrap_err() {
            ReconciliationError::InvariantViolation(_) => {}
            other => panic!("Expected InvariantViolation, got {other:?}"),
        }
        assert_eq!(
            service.shipment(shipment_id).unwrap().status(),
            ShipmentStatus::Verified
        );
    }

    #[test]
    fn non_positive_quantity_is_a_validation_error() {
        let mut service = setup();
        let shipment_id = shipment_with(&mut service, "S1", &[]);

        match service.add_item(shipment_id, &pid("P1"), 0).unwrap_err() {
            ReconciliationError::Validation(_) => {}
            other => panic!("Expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn negative_received_count_changes_nothing() {
        let mut service = setup();
        let shipment_id = shipment_with(&mut service, "S1", &[("P1", 3)]);

        match service
            .verify_shipment(shipment_id, ReceivedQuantities::new().with(pid("P1"), -2))
            .unwrap_err()
        {
            ReconciliationError::Validation(_) => {}
            other => panic!("Expected Validation, got {other:?}"),
        }
        assert!(service.inventory().events().is_empty());
        assert_eq!(
            service.shipment(shipment_id).unwrap().status(),
            ShipmentStatus::Scheduled
        );
    }

    #[test]
    fn unexpected_products_are_ignored() {
        let mut service = setup();
        let shipment_id = shipment_with(&mut service, "S1", &[("P1", 2)]);

        let report = service
            .verify_shipment(
                shipment_id,
                ReceivedQuantities::new().with(pid("P1"), 2).with(pid("P4"), 6),
            )
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.unexpected, vec![pid("P4")]);
        assert_eq!(stock(&service, "P4"), 0);
    }

    #[test]
    fn empty_manifest_verifies_clean() {
        let mut service = setup();
        let shipment_id = shipment_with(&mut service, "S2", &[]);
        service.confirm_shipment(shipment_id).unwrap();

        let report = service
            .verify_shipment(shipment_id, ReceivedQuantities::new())
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(rating(&service, "S2"), MAX_RATING);
    }

    #[test]
    fn confirmation_is_advisory_unless_required() {
        let mut service = setup_with(ReconciliationConfig {
            require_confirmation: true,
            ..ReconciliationConfig::default()
        });
        let shipment_id = shipment_with(&mut service, "S1", &[("P1", 1)]);
        let received = ReceivedQuantities::new().with(pid("P1"), 1);

        match service
            .verify_shipment(shipment_id, received.clone())
            .unwrap_err()
        {
            ReconciliationError::InvariantViolation(_) => {}
            other => panic!("Expected InvariantViolation, got {other:?}"),
        }

        service.confirm_shipment(shipment_id).unwrap();
        assert!(service.verify_shipment(shipment_id, received).unwrap().is_clean());
    }

    #[test]
    fn rating_tracks_share_of_clean_deliveries() {
        let mut service = setup();
        for received in [10, 10, 9, 10] {
            let shipment_id = shipment_with(&mut service, "S1", &[("P1", 10)]);
            service
                .verify_shipment(shipment_id, ReceivedQuantities::new().with(pid("P1"), received))
                .unwrap();
        }

        assert_eq!(rating(&service, "S1"), 3.75);
        assert_eq!(service.ratings_snapshot()[&sid("S2")], MAX_RATING);
        assert_eq!(stock(&service, "P1"), 39);
    }

    #[test]
    fn pending_shipments_is_a_live_view() {
        let mut service = setup();
        let first = shipment_with(&mut service, "S1", &[("P1", 1)]);
        let second = shipment_with(&mut service, "S2", &[("P2", 1)]);
        service.confirm_shipment(second).unwrap();

        let pending: Vec<_> = service.pending_shipments().iter().map(|s| s.id_typed()).collect();
        assert_eq!(pending, vec![first, second]);

        service
            .verify_shipment(first, ReceivedQuantities::new().with(pid("P1"), 1))
            .unwrap();

        let pending: Vec<_> = service.pending_shipments().iter().map(|s| s.id_typed()).collect();
        assert_eq!(pending, vec![second]);
        assert_eq!(service.shipments().len(), 2);
    }

    #[test]
    fn shipments_are_scoped_to_the_current_store() {
        let mut service = setup();
        let north = shipment_with(&mut service, "S1", &[("P1", 5)]);

        service.set_current_store(store("south"));
        assert!(service.pending_shipments().is_empty());
        assert!(service.shipment(north).unwrap_err().is_not_found());

        let south = shipment_with(&mut service, "S1", &[("P1", 4)]);
        service
            .verify_shipment(south, ReceivedQuantities::new().with(pid("P1"), 4))
            .unwrap();
        assert_eq!(stock(&service, "P1"), 4);
        assert_eq!(
            service.shipment(south).unwrap().store_id(),
            Some(&store("south"))
        );

        service.set_current_store(store("store-1"));
        assert_eq!(stock(&service, "P1"), 0);
        assert_eq!(service.pending_shipments().len(), 1);
        assert_eq!(service.pending_shipments()[0].id_typed(), north);
    }

    #[test]
    fn audit_trail_records_every_change_in_order() {
        let mut service = setup();
        let shipment_id = shipment_with(&mut service, "S1", &[("P1", 3), ("P1", 4)]);
        service.confirm_shipment(shipment_id).unwrap();
        service
            .verify_shipment(shipment_id, ReceivedQuantities::new().with(pid("P1"), 4))
            .unwrap();

        let trail = service.audit_trail(&shipment_id.to_string());
        let types: Vec<_> = trail.iter().map(|e| e.event_type()).collect();
        assert_eq!(
            types,
            vec![
                "shipments.shipment.scheduled",
                "shipments.shipment.line_set",
                "shipments.shipment.line_set",
                "shipments.shipment.confirmed",
                "shipments.shipment.line_restocked",
                "shipments.shipment.verified",
            ]
        );
        let seqs: Vec<_> = trail.iter().map(|e| e.sequence_number()).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5, 6]);
        assert!(trail.iter().all(|e| e.store_id() == &store("store-1")));

        let supplier_trail = service.audit_trail("S1");
        assert_eq!(supplier_trail.len(), 2);
        assert_eq!(supplier_trail[1].event_type(), "suppliers.supplier.outcome_recorded");
    }

    #[test]
    fn duplicate_supplier_record_is_a_conflict() {
        let mut service = setup();
        match service.register_supplier(record("S1")).unwrap_err() {
            ReconciliationError::Conflict(_) => {}
            other => panic!("Expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn invalid_initial_store_is_rejected() {
        let config = ReconciliationConfig {
            initial_store: "  ".to_string(),
            ..ReconciliationConfig::default()
        };
        let result = ReconciliationService::new(
            config,
            SupplierRegistry::new(),
            catalog(),
            InMemoryInventory::new(),
        );
        match result {
            Err(ReconciliationError::Validation(_)) => {}
            Err(other) => panic!("Expected Validation, got {other:?}"),
            Ok(_) => panic!("Expected Validation, got a service"),
        }
    }

    /// Inventory that refuses restocks of one product a limited number of times.
    #[derive(Debug, Default)]
    struct RefusingInventory {
        inner: InMemoryInventory,
        refused: Option<ProductId>,
        refusals_left: u32,
    }

    impl StockRestocker for RefusingInventory {
        fn restock(
            &mut self,
            item_id: &StockItemId,
            quantity: i64,
            shipment_id: ShipmentId,
            occurred_at: DateTime<Utc>,
        ) -> DomainResult<()> {
            if self.refused.as_ref() == Some(&item_id.product_id) && self.refusals_left > 0 {
                self.refusals_left -= 1;
                return Err(DomainError::invariant("stock location closed"));
            }
            self.inner.restock(item_id, quantity, shipment_id, occurred_at)
        }
    }

    type RefusingService = ReconciliationService<InMemoryProductCatalog, RefusingInventory>;

    /// Service with a {P1: 2, P2: 3} shipment whose P2 restock is refused `refusals` times.
    fn refusing_setup(refusals: u32) -> (RefusingService, ShipmentId) {
        let inventory = RefusingInventory {
            inner: InMemoryInventory::new(),
            refused: Some(pid("P2")),
            refusals_left: refusals,
        };
        let mut service = ReconciliationService::new(
            ReconciliationConfig::default(),
            SupplierRegistry::new(),
            catalog(),
            inventory,
        )
        .unwrap();
        service.register_supplier(record("S1")).unwrap();

        let shipment_id = service
            .create_shipment(&sid("S1"), test_time())
            .unwrap()
            .id_typed();
        service.add_item(shipment_id, &pid("P1"), 2).unwrap();
        service.add_item(shipment_id, &pid("P2"), 3).unwrap();
        (service, shipment_id)
    }

    #[test]
    fn restock_failure_leaves_shipment_unverified() {
        let (mut service, shipment_id) = refusing_setup(u32::MAX);

        let received = ReceivedQuantities::new().with(pid("P1"), 2).with(pid("P2"), 3);
        match service.verify_shipment(shipment_id, received).unwrap_err() {
            ReconciliationError::Restock { product_id, .. } => assert_eq!(product_id, pid("P2")),
            other => panic!("Expected Restock, got {other:?}"),
        }

        // Lines before the failure stay restocked.
        let p1 = StockItemId::new(store("store-1"), pid("P1"));
        assert_eq!(service.inventory().inner.stock_level(&p1), 2);
        assert_eq!(
            service.shipment(shipment_id).unwrap().status(),
            ShipmentStatus::Scheduled
        );
        let supplier = service.supplier(&sid("S1")).unwrap();
        assert_eq!(supplier.performance().total_shipments(), 0);

        // Receiving has started, so the manifest is frozen.
        assert!(service.shipment(shipment_id).unwrap().is_receiving());
        match service.add_item(shipment_id, &pid("P1"), 9).unwrap_err() {
            ReconciliationError::InvariantViolation(_) => {}
            other => panic!("Expected InvariantViolation, got {other:?}"),
        }
    }

    #[test]
    fn retry_after_restock_failure_restocks_each_line_once() {
        let (mut service, shipment_id) = refusing_setup(1);
        let received = ReceivedQuantities::new().with(pid("P1"), 2).with(pid("P2"), 3);

        assert!(service.verify_shipment(shipment_id, received.clone()).is_err());
        let report = service.verify_shipment(shipment_id, received).unwrap();

        assert!(report.is_clean());
        let p1 = StockItemId::new(store("store-1"), pid("P1"));
        let p2 = StockItemId::new(store("store-1"), pid("P2"));
        let inventory = &service.inventory().inner;
        assert_eq!(inventory.restocks_of(&p1), vec![2]);
        assert_eq!(inventory.restocks_of(&p2), vec![3]);
        assert_eq!(inventory.stock_level(&p1), 2);
        assert_eq!(inventory.stock_level(&p2), 3);

        assert!(service.shipment(shipment_id).unwrap().is_verified());
        let supplier = service.supplier(&sid("S1")).unwrap();
        assert_eq!(supplier.performance().total_shipments(), 1);
        assert_eq!(supplier.rating(), MAX_RATING);
    }

    #[test]
    fn retry_reports_the_count_that_reached_inventory() {
        let (mut service, shipment_id) = refusing_setup(1);

        let first = ReceivedQuantities::new().with(pid("P1"), 2).with(pid("P2"), 3);
        assert!(service.verify_shipment(shipment_id, first).is_err());

        // A recount of P1 on retry does not restock it again.
        let recount = ReceivedQuantities::new().with(pid("P1"), 5).with(pid("P2"), 3);
        let report = service.verify_shipment(shipment_id, recount).unwrap();

        assert_eq!(report.lines[0].received, 2);
        assert!(report.is_clean());
        let p1 = StockItemId::new(store("store-1"), pid("P1"));
        assert_eq!(service.inventory().inner.restocks_of(&p1), vec![2]);
    }

    #[test]
    fn concurrent_verification_succeeds_once() {
        let mut service = setup();
        let shipment_id = shipment_with(&mut service, "S1", &[("P1", 10)]);
        let service = Arc::new(Mutex::new(service));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || {
                    let mut service = service.lock().unwrap();
                    service
                        .verify_shipment(shipment_id, ReceivedQuantities::new().with(pid("P1"), 10))
                        .is_ok()
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 1);

        let service = service.lock().unwrap();
        assert_eq!(stock(&service, "P1"), 10);
        assert_eq!(
            service.supplier(&sid("S1")).unwrap().performance().total_shipments(),
            1
        );
    }
}
