//! Per-store shipment ledgers and the current-store context.

use std::collections::HashMap;

use retailops_core::{DomainError, DomainResult, StoreId};

use crate::shipment::{Shipment, ShipmentId, ShipmentStatus};

/// One store's shipments in insertion order, indexed by id.
#[derive(Debug, Default, Clone)]
struct StoreLedger {
    shipments: Vec<Shipment>,
    index: HashMap<ShipmentId, usize>,
}

impl StoreLedger {
    fn push(&mut self, shipment: Shipment) -> &Shipment {
        let position = self.shipments.len();
        self.index.insert(shipment.id_typed(), position);
        self.shipments.push(shipment);
        &self.shipments[position]
    }

    fn get(&self, shipment_id: &ShipmentId) -> Option<&Shipment> {
        self.index.get(shipment_id).map(|pos| &self.shipments[*pos])
    }

    fn get_mut(&mut self, shipment_id: &ShipmentId) -> Option<&mut Shipment> {
        let pos = *self.index.get(shipment_id)?;
        self.shipments.get_mut(pos)
    }
}

/// Shipment ledgers for every store seen this session.
///
/// Operations address the ledger of the *current* store; switching to a store
/// that has never been seen starts it with an empty ledger. Shipments are
/// never removed.
#[derive(Debug, Clone)]
pub struct StoreLedgers {
    ledgers: HashMap<StoreId, StoreLedger>,
    current: StoreId,
}

impl StoreLedgers {
    pub fn new(initial_store: StoreId) -> Self {
        let mut ledgers = HashMap::new();
        ledgers.insert(initial_store.clone(), StoreLedger::default());
        Self {
            ledgers,
            current: initial_store,
        }
    }

    pub fn current_store(&self) -> &StoreId {
        &self.current
    }

    /// Switch the store context, creating an empty ledger on first use.
    pub fn set_current_store(&mut self, store_id: StoreId) {
        self.ledgers.entry(store_id.clone()).or_default();
        self.current = store_id;
    }

    /// Append a scheduled shipment to the current store's ledger.
    ///
    /// The shipment must be destined for the current store and not already
    /// be on the ledger.
    pub fn append(&mut self, shipment: Shipment) -> DomainResult<&Shipment> {
        if !shipment.is_scheduled() {
            return Err(DomainError::invariant("only scheduled shipments can be recorded"));
        }
        if shipment.store_id() != Some(&self.current) {
            return Err(DomainError::invariant(format!(
                "shipment {} is not destined for store {}",
                shipment.id_typed(),
                self.current
            )));
        }

        let ledger = self.current_ledger_mut();
        if ledger.get(&shipment.id_typed()).is_some() {
            return Err(DomainError::conflict(format!(
                "shipment {} is already recorded",
                shipment.id_typed()
            )));
        }
        Ok(ledger.push(shipment))
    }

    /// Look up a shipment in the current store's ledger.
    pub fn get(&self, shipment_id: &ShipmentId) -> Option<&Shipment> {
        self.current_ledger().and_then(|ledger| ledger.get(shipment_id))
    }

    pub fn get_mut(&mut self, shipment_id: &ShipmentId) -> Option<&mut Shipment> {
        self.current_ledger_mut().get_mut(shipment_id)
    }

    /// Like [`StoreLedgers::get`], but unknown ids are `NotFound`.
    pub fn require(&self, shipment_id: &ShipmentId) -> DomainResult<&Shipment> {
        self.get(shipment_id).ok_or_else(|| {
            DomainError::not_found(format!(
                "shipment {shipment_id} in store {}",
                self.current
            ))
        })
    }

    /// Every shipment of the current store, in insertion order.
    pub fn shipments(&self) -> &[Shipment] {
        self.current_ledger()
            .map(|ledger| ledger.shipments.as_slice())
            .unwrap_or(&[])
    }

    /// Shipments of the current store that are not yet verified, in insertion order.
    ///
    /// Each call reflects the ledger as it is now.
    pub fn pending(&self) -> impl Iterator<Item = &Shipment> {
        self.shipments()
            .iter()
            .filter(|shipment| shipment.status() != ShipmentStatus::Verified)
    }

    /// Shipments of any store, without switching context.
    pub fn shipments_for(&self, store_id: &StoreId) -> &[Shipment] {
        self.ledgers
            .get(store_id)
            .map(|ledger| ledger.shipments.as_slice())
            .unwrap_or(&[])
    }

    /// Stores that have a ledger, in no particular order.
    pub fn stores(&self) -> impl Iterator<Item = &StoreId> {
        self.ledgers.keys()
    }

    fn current_ledger(&self) -> Option<&StoreLedger> {
        self.ledgers.get(&self.current)
    }

    fn current_ledger_mut(&mut self) -> &mut StoreLedger {
        self.ledgers.entry(self.current.clone()).or_default()
    }
}
