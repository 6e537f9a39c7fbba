use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use retailops_core::{Aggregate, AggregateId, AggregateRoot, DomainError, StoreId};
use retailops_events::Event;
use retailops_products::ProductId;
use retailops_suppliers::SupplierId;

use crate::manifest::{reconcile, ManifestLine, ReceivedQuantities, ReconciledLine};

/// Shipment identifier (store-scoped via the `store_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipmentId(pub AggregateId);

impl ShipmentId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    /// Allocate a fresh, time-ordered shipment id.
    pub fn generate() -> Self {
        Self(AggregateId::new())
    }
}

impl core::fmt::Display for ShipmentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Shipment status lifecycle.
///
/// Variants are declared in lifecycle order, so `Ord` follows it and a status
/// never compares lower after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentStatus {
    Scheduled,
    Confirmed,
    Verified,
}

/// Aggregate root: Shipment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shipment {
    id: ShipmentId,
    store_id: Option<StoreId>,
    supplier_id: Option<SupplierId>,
    scheduled_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    status: ShipmentStatus,
    manifest: Vec<ManifestLine>,
    /// Quantities already restocked per product by an unfinished verification.
    restocked: BTreeMap<ProductId, i64>,
    version: u64,
    created: bool,
}

impl Shipment {
    /// Create an empty, not-yet-scheduled aggregate instance.
    pub fn empty(id: ShipmentId) -> Self {
        Self {
            id,
            store_id: None,
            supplier_id: None,
            scheduled_at: None,
            delivered_at: None,
            status: ShipmentStatus::Scheduled,
            manifest: Vec::new(),
            restocked: BTreeMap::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ShipmentId {
        self.id
    }

    pub fn store_id(&self) -> Option<&StoreId> {
        self.store_id.as_ref()
    }

    pub fn supplier_id(&self) -> Option<&SupplierId> {
        self.supplier_id.as_ref()
    }

    pub fn scheduled_at(&self) -> Option<DateTime<Utc>> {
        self.scheduled_at
    }

    /// Actual delivery time; unset until the shipment is verified.
    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn status(&self) -> ShipmentStatus {
        self.status
    }

    pub fn manifest(&self) -> &[ManifestLine] {
        &self.manifest
    }

    /// Expected quantity for a product, if it is on the manifest.
    pub fn expected_quantity(&self, product_id: &ProductId) -> Option<i64> {
        self.manifest
            .iter()
            .find(|line| &line.product_id == product_id)
            .map(|line| line.expected_quantity)
    }

    pub fn is_scheduled(&self) -> bool {
        self.created
    }

    pub fn is_verified(&self) -> bool {
        self.status == ShipmentStatus::Verified
    }

    /// Quantity already restocked for a manifest product, if any.
    pub fn restocked_quantity(&self, product_id: &ProductId) -> Option<i64> {
        self.restocked.get(product_id).copied()
    }

    /// `true` once any manifest line has been restocked; the manifest is
    /// frozen from then on.
    pub fn is_receiving(&self) -> bool {
        !self.restocked.is_empty()
    }
}

impl AggregateRoot for Shipment {
    type Id = ShipmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: ScheduleShipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleShipment {
    pub shipment_id: ShipmentId,
    pub store_id: StoreId,
    pub supplier_id: SupplierId,
    pub scheduled_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddItem (allowed until the shipment is verified).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItem {
    pub shipment_id: ShipmentId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmShipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmShipment {
    pub shipment_id: ShipmentId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordLineRestock (one manifest line reached inventory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLineRestock {
    pub shipment_id: ShipmentId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: VerifyShipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyShipment {
    pub shipment_id: ShipmentId,
    pub received: ReceivedQuantities,
    /// When set, only confirmed shipments can be verified.
    pub require_confirmation: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentCommand {
    ScheduleShipment(ScheduleShipment),
    AddItem(AddItem),
    ConfirmShipment(ConfirmShipment),
    RecordLineRestock(RecordLineRestock),
    VerifyShipment(VerifyShipment),
}

/// Event: ShipmentScheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentScheduled {
    pub shipment_id: ShipmentId,
    pub store_id: StoreId,
    pub supplier_id: SupplierId,
    pub scheduled_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ManifestLineSet.
///
/// Setting a product that is already on the manifest replaces its expected
/// quantity (the line keeps its number); `replaced` carries the old value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestLineSet {
    pub shipment_id: ShipmentId,
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity: i64,
    pub replaced: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ShipmentConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentConfirmed {
    pub shipment_id: ShipmentId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineRestocked.
///
/// Progress marker of a verification: a retried verification skips lines
/// that already carry one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRestocked {
    pub shipment_id: ShipmentId,
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ShipmentVerified.
///
/// Carries the reconciled lines so inventory can be restocked from what
/// physically arrived and the supplier rated on whether anything mismatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentVerified {
    pub shipment_id: ShipmentId,
    pub store_id: StoreId,
    pub supplier_id: SupplierId,
    pub lines: Vec<ReconciledLine>,
    /// Counted products that were not on the manifest (ignored for stock and rating).
    pub unexpected: Vec<ProductId>,
    pub occurred_at: DateTime<Utc>,
}

impl ShipmentVerified {
    pub fn had_discrepancy(&self) -> bool {
        self.lines.iter().any(ReconciledLine::is_discrepant)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentEvent {
    ShipmentScheduled(ShipmentScheduled),
    ManifestLineSet(ManifestLineSet),
    ShipmentConfirmed(ShipmentConfirmed),
    LineRestocked(LineRestocked),
    ShipmentVerified(ShipmentVerified),
}

impl Event for ShipmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ShipmentEvent::ShipmentScheduled(_) => "shipments.shipment.scheduled",
            ShipmentEvent::ManifestLineSet(_) => "shipments.shipment.line_set",
            ShipmentEvent::ShipmentConfirmed(_) => "shipments.shipment.confirmed",
            ShipmentEvent::LineRestocked(_) => "shipments.shipment.line_restocked",
            ShipmentEvent::ShipmentVerified(_) => "shipments.shipment.verified",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ShipmentEvent::ShipmentScheduled(e) => e.occurred_at,
            ShipmentEvent::ManifestLineSet(e) => e.occurred_at,
            ShipmentEvent::ShipmentConfirmed(e) => e.occurred_at,
            ShipmentEvent::LineRestocked(e) => e.occurred_at,
            ShipmentEvent::ShipmentVerified(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Shipment {
    type Command = ShipmentCommand;
    type Event = ShipmentEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ShipmentEvent::ShipmentScheduled(e) => {
                self.id = e.shipment_id;
                self.store_id = Some(e.store_id.clone());
                self.supplier_id = Some(e.supplier_id.clone());
                self.scheduled_at = Some(e.scheduled_at);
                self.delivered_at = None;
                self.status = ShipmentStatus::Scheduled;
                self.manifest.clear();
                self.restocked.clear();
                self.created = true;
            }
            ShipmentEvent::ManifestLineSet(e) => {
                match self
                    .manifest
                    .iter_mut()
                    .find(|line| line.product_id == e.product_id)
                {
                    Some(line) => line.expected_quantity = e.quantity,
                    None => self.manifest.push(ManifestLine {
                        line_no: e.line_no,
                        product_id: e.product_id.clone(),
                        expected_quantity: e.quantity,
                    }),
                }
            }
            ShipmentEvent::ShipmentConfirmed(_) => {
                self.status = ShipmentStatus::Confirmed;
            }
            ShipmentEvent::LineRestocked(e) => {
                self.restocked.insert(e.product_id.clone(), e.quantity);
            }
            ShipmentEvent::ShipmentVerified(e) => {
                self.status = ShipmentStatus::Verified;
                self.delivered_at = Some(e.occurred_at);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ShipmentCommand::ScheduleShipment(cmd) => self.handle_schedule(cmd),
            ShipmentCommand::AddItem(cmd) => self.handle_add_item(cmd),
            ShipmentCommand::ConfirmShipment(cmd) => self.handle_confirm(cmd),
            ShipmentCommand::RecordLineRestock(cmd) => self.handle_line_restock(cmd),
            ShipmentCommand::VerifyShipment(cmd) => self.handle_verify(cmd),
        }
    }
}

impl Shipment {
    fn ensure_shipment_id(&self, shipment_id: ShipmentId) -> Result<(), DomainError> {
        if self.id != shipment_id {
            return Err(DomainError::invariant("shipment_id mismatch"));
        }
        Ok(())
    }

    fn ensure_scheduled(&self, shipment_id: ShipmentId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("shipment {shipment_id}")));
        }
        self.ensure_shipment_id(shipment_id)
    }

    fn handle_schedule(&self, cmd: &ScheduleShipment) -> Result<Vec<ShipmentEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict(format!(
                "shipment {} already exists",
                cmd.shipment_id
            )));
        }

        Ok(vec![ShipmentEvent::ShipmentScheduled(ShipmentScheduled {
            shipment_id: cmd.shipment_id,
            store_id: cmd.store_id.clone(),
            supplier_id: cmd.supplier_id.clone(),
            scheduled_at: cmd.scheduled_at,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_item(&self, cmd: &AddItem) -> Result<Vec<ShipmentEvent>, DomainError> {
        self.ensure_scheduled(cmd.shipment_id)?;

        if self.status == ShipmentStatus::Verified {
            return Err(DomainError::invariant(
                "cannot modify a shipment once it is verified",
            ));
        }

        if self.is_receiving() {
            return Err(DomainError::invariant(
                "cannot modify the manifest once receiving has started",
            ));
        }

        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        let existing = self
            .manifest
            .iter()
            .find(|line| line.product_id == cmd.product_id);
        let line_no = match existing {
            Some(line) => line.line_no,
            None => (self.manifest.len() as u32) + 1,
        };

        Ok(vec![ShipmentEvent::ManifestLineSet(ManifestLineSet {
            shipment_id: cmd.shipment_id,
            line_no,
            product_id: cmd.product_id.clone(),
            quantity: cmd.quantity,
            replaced: existing.map(|line| line.expected_quantity),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm(&self, cmd: &ConfirmShipment) -> Result<Vec<ShipmentEvent>, DomainError> {
        self.ensure_scheduled(cmd.shipment_id)?;

        match self.status {
            ShipmentStatus::Scheduled => {}
            ShipmentStatus::Confirmed => {
                return Err(DomainError::conflict("shipment is already confirmed"));
            }
            ShipmentStatus::Verified => {
                return Err(DomainError::invariant(
                    "cannot confirm a shipment once it is verified",
                ));
            }
        }

        Ok(vec![ShipmentEvent::ShipmentConfirmed(ShipmentConfirmed {
            shipment_id: cmd.shipment_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_line_restock(
        &self,
        cmd: &RecordLineRestock,
    ) -> Result<Vec<ShipmentEvent>, DomainError> {
        self.ensure_scheduled(cmd.shipment_id)?;

        if self.status == ShipmentStatus::Verified {
            return Err(DomainError::conflict(format!(
                "shipment {} is already verified",
                cmd.shipment_id
            )));
        }

        if cmd.quantity < 0 {
            return Err(DomainError::validation("restocked quantity cannot be negative"));
        }

        let line = self
            .manifest
            .iter()
            .find(|line| line.product_id == cmd.product_id)
            .ok_or_else(|| {
                DomainError::invariant(format!(
                    "product {} is not on the manifest",
                    cmd.product_id
                ))
            })?;

        if self.restocked.contains_key(&cmd.product_id) {
            return Err(DomainError::conflict(format!(
                "line {} of shipment {} is already restocked",
                line.line_no, cmd.shipment_id
            )));
        }

        Ok(vec![ShipmentEvent::LineRestocked(LineRestocked {
            shipment_id: cmd.shipment_id,
            line_no: line.line_no,
            product_id: cmd.product_id.clone(),
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_verify(&self, cmd: &VerifyShipment) -> Result<Vec<ShipmentEvent>, DomainError> {
        self.ensure_scheduled(cmd.shipment_id)?;

        // Re-verification would double-apply restocks and rating updates.
        if self.status == ShipmentStatus::Verified {
            return Err(DomainError::conflict(format!(
                "shipment {} is already verified",
                cmd.shipment_id
            )));
        }

        if cmd.require_confirmation && self.status != ShipmentStatus::Confirmed {
            return Err(DomainError::invariant(
                "shipment must be confirmed before it can be verified",
            ));
        }

        cmd.received.validate()?;

        let (store_id, supplier_id) = match (&self.store_id, &self.supplier_id) {
            (Some(store), Some(supplier)) => (store.clone(), supplier.clone()),
            _ => return Err(DomainError::invariant("store and supplier must be set")),
        };

        let unexpected = cmd
            .received
            .iter()
            .filter(|(product_id, _)| self.expected_quantity(product_id).is_none())
            .map(|(product_id, _)| product_id.clone())
            .collect();

        // Lines restocked by an interrupted attempt keep the count that
        // actually reached inventory.
        let mut lines = reconcile(&self.manifest, &cmd.received);
        for line in &mut lines {
            if let Some(quantity) = self.restocked_quantity(&line.product_id) {
                line.received = quantity;
            }
        }

        Ok(vec![ShipmentEvent::ShipmentVerified(ShipmentVerified {
            shipment_id: cmd.shipment_id,
            store_id,
            supplier_id,
            lines,
            unexpected,
            occurred_at: cmd.occurred_at,
        })])
    }
}
