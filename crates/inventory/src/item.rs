use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use retailops_core::{Aggregate, AggregateId, AggregateRoot, DomainError, StoreId};
use retailops_events::Event;
use retailops_products::ProductId;

/// Stock item identifier: one product's stock at one store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockItemId {
    pub store_id: StoreId,
    pub product_id: ProductId,
}

impl StockItemId {
    pub fn new(store_id: StoreId, product_id: ProductId) -> Self {
        Self {
            store_id,
            product_id,
        }
    }
}

impl core::fmt::Display for StockItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.store_id, self.product_id)
    }
}

/// Aggregate root: StockItem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockItem {
    id: StockItemId,
    stock: i64,
    version: u64,
    created: bool,
}

impl StockItem {
    /// Create an empty, not-yet-tracked aggregate instance.
    pub fn empty(id: StockItemId) -> Self {
        Self {
            id,
            stock: 0,
            version: 0,
            created: false,
        }
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn is_tracked(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for StockItem {
    type Id = StockItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: TrackItem (start keeping stock for a product at a store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackItem {
    pub item_id: StockItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Restock.
///
/// A zero quantity is accepted: it records that a counted delivery line
/// brought nothing in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restock {
    pub item_id: StockItemId,
    pub quantity: i64,
    /// Shipment the stock arrived with, if any.
    pub shipment_id: Option<AggregateId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryCommand {
    TrackItem(TrackItem),
    Restock(Restock),
}

/// Event: ItemTracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTracked {
    pub item_id: StockItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockRestocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRestocked {
    pub item_id: StockItemId,
    pub quantity: i64,
    pub shipment_id: Option<AggregateId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    ItemTracked(ItemTracked),
    StockRestocked(StockRestocked),
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::ItemTracked(_) => "inventory.item.tracked",
            InventoryEvent::StockRestocked(_) => "inventory.item.restocked",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::ItemTracked(e) => e.occurred_at,
            InventoryEvent::StockRestocked(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StockItem {
    type Command = InventoryCommand;
    type Event = InventoryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InventoryEvent::ItemTracked(e) => {
                self.id = e.item_id.clone();
                self.stock = 0;
                self.created = true;
            }
            InventoryEvent::StockRestocked(e) => {
                self.stock += e.quantity;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InventoryCommand::TrackItem(cmd) => self.handle_track(cmd),
            InventoryCommand::Restock(cmd) => self.handle_restock(cmd),
        }
    }
}

impl StockItem {
    fn ensure_item_id(&self, item_id: &StockItemId) -> Result<(), DomainError> {
        if &self.id != item_id {
            return Err(DomainError::invariant("item_id mismatch"));
        }
        Ok(())
    }

    fn handle_track(&self, cmd: &TrackItem) -> Result<Vec<InventoryEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict(format!(
                "stock item {} already tracked",
                cmd.item_id
            )));
        }
        Ok(vec![InventoryEvent::ItemTracked(ItemTracked {
            item_id: cmd.item_id.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_restock(&self, cmd: &Restock) -> Result<Vec<InventoryEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("stock item {}", cmd.item_id)));
        }
        self.ensure_item_id(&cmd.item_id)?;

        if cmd.quantity < 0 {
            return Err(DomainError::validation("restock quantity cannot be negative"));
        }

        if self.stock.checked_add(cmd.quantity).is_none() {
            return Err(DomainError::invariant("stock level overflow"));
        }

        Ok(vec![InventoryEvent::StockRestocked(StockRestocked {
            item_id: cmd.item_id.clone(),
            quantity: cmd.quantity,
            shipment_id: cmd.shipment_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
