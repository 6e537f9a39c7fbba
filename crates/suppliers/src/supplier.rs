use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use retailops_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ValueObject, impl_code_newtype};
use retailops_events::Event;

/// Rating of a supplier with no recorded discrepancies.
pub const MAX_RATING: f64 = 5.0;

/// Supplier identifier (code assigned by the supplier records file).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierId(String);

impl_code_newtype!(SupplierId, "SupplierId");

/// Contact details for a supplier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    /// Free-form contact line (phone, email or person).
    pub contact: String,
    pub address: String,
}

impl ValueObject for ContactInfo {}

/// Long-run delivery performance counters.
///
/// The rating is derived from the counters rather than stored, so
/// `rating == 5.0 * (1 - discrepant / total)` holds by construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierPerformance {
    total_shipments: u32,
    discrepant_shipments: u32,
}

impl ValueObject for SupplierPerformance {}

impl SupplierPerformance {
    pub fn total_shipments(&self) -> u32 {
        self.total_shipments
    }

    pub fn discrepant_shipments(&self) -> u32 {
        self.discrepant_shipments
    }

    /// Rating in `[0, 5]`; `5.0` before the first shipment.
    pub fn rating(&self) -> f64 {
        if self.total_shipments == 0 {
            return MAX_RATING;
        }
        let ratio = f64::from(self.discrepant_shipments) / f64::from(self.total_shipments);
        MAX_RATING * (1.0 - ratio)
    }

    /// Counters after one more verified shipment.
    ///
    /// A counter that would overflow is an invariant violation; the counters
    /// are left as they were.
    pub fn with_outcome(self, had_discrepancy: bool) -> Result<Self, DomainError> {
        let total_shipments = self
            .total_shipments
            .checked_add(1)
            .ok_or_else(|| DomainError::invariant("total shipment count overflow"))?;
        let discrepant_shipments = if had_discrepancy {
            self.discrepant_shipments
                .checked_add(1)
                .ok_or_else(|| DomainError::invariant("discrepant shipment count overflow"))?
        } else {
            self.discrepant_shipments
        };
        Ok(Self {
            total_shipments,
            discrepant_shipments,
        })
    }
}

/// Aggregate root: Supplier.
#[derive(Debug, Clone, PartialEq)]
pub struct Supplier {
    id: SupplierId,
    name: String,
    contact: ContactInfo,
    performance: SupplierPerformance,
    version: u64,
    created: bool,
}

impl Supplier {
    /// Create an empty, not-yet-registered aggregate instance.
    pub fn empty(id: SupplierId) -> Self {
        Self {
            id,
            name: String::new(),
            contact: ContactInfo::default(),
            performance: SupplierPerformance::default(),
            version: 0,
            created: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn performance(&self) -> SupplierPerformance {
        self.performance
    }

    pub fn rating(&self) -> f64 {
        self.performance.rating()
    }

    pub fn total_shipments(&self) -> u32 {
        self.performance.total_shipments()
    }

    pub fn discrepant_shipments(&self) -> u32 {
        self.performance.discrepant_shipments()
    }

    pub fn is_registered(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterSupplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSupplier {
    pub supplier_id: SupplierId,
    pub name: String,
    pub contact: ContactInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordShipmentOutcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordShipmentOutcome {
    pub supplier_id: SupplierId,
    /// Shipment whose verification produced this outcome.
    pub shipment_id: AggregateId,
    pub had_discrepancy: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplierCommand {
    RegisterSupplier(RegisterSupplier),
    RecordShipmentOutcome(RecordShipmentOutcome),
}

/// Event: SupplierRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierRegistered {
    pub supplier_id: SupplierId,
    pub name: String,
    pub contact: ContactInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ShipmentOutcomeRecorded.
///
/// Carries the counters after the outcome so the audit trail shows how the
/// rating evolved without replaying the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentOutcomeRecorded {
    pub supplier_id: SupplierId,
    pub shipment_id: AggregateId,
    pub had_discrepancy: bool,
    pub performance: SupplierPerformance,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplierEvent {
    SupplierRegistered(SupplierRegistered),
    ShipmentOutcomeRecorded(ShipmentOutcomeRecorded),
}

impl Event for SupplierEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SupplierEvent::SupplierRegistered(_) => "suppliers.supplier.registered",
            SupplierEvent::ShipmentOutcomeRecorded(_) => "suppliers.supplier.outcome_recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SupplierEvent::SupplierRegistered(e) => e.occurred_at,
            SupplierEvent::ShipmentOutcomeRecorded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Supplier {
    type Command = SupplierCommand;
    type Event = SupplierEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SupplierEvent::SupplierRegistered(e) => {
                self.id = e.supplier_id.clone();
                self.name = e.name.clone();
                self.contact = e.contact.clone();
                self.performance = SupplierPerformance::default();
                self.created = true;
            }
            SupplierEvent::ShipmentOutcomeRecorded(e) => {
                self.performance = e.performance;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SupplierCommand::RegisterSupplier(cmd) => self.handle_register(cmd),
            SupplierCommand::RecordShipmentOutcome(cmd) => self.handle_record_outcome(cmd),
        }
    }
}

impl Supplier {
    fn ensure_supplier_id(&self, supplier_id: &SupplierId) -> Result<(), DomainError> {
        if &self.id != supplier_id {
            return Err(DomainError::invariant("supplier_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterSupplier) -> Result<Vec<SupplierEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict(format!(
                "supplier {} already exists",
                cmd.supplier_id
            )));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("supplier name cannot be empty"));
        }

        Ok(vec![SupplierEvent::SupplierRegistered(SupplierRegistered {
            supplier_id: cmd.supplier_id.clone(),
            name: cmd.name.trim().to_string(),
            contact: cmd.contact.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_outcome(
        &self,
        cmd: &RecordShipmentOutcome,
    ) -> Result<Vec<SupplierEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("supplier {}", cmd.supplier_id)));
        }
        self.ensure_supplier_id(&cmd.supplier_id)?;

        let performance = self.performance.with_outcome(cmd.had_discrepancy)?;

        Ok(vec![SupplierEvent::ShipmentOutcomeRecorded(
            ShipmentOutcomeRecorded {
                supplier_id: cmd.supplier_id.clone(),
                shipment_id: cmd.shipment_id,
                had_discrepancy: cmd.had_discrepancy,
                performance,
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}
