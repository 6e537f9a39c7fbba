use std::collections::HashMap;

use chrono::{DateTime, Utc};

use retailops_core::{Aggregate, DomainResult};
use retailops_inventory::{InventoryCommand, InventoryEvent, Restock, StockItem, StockItemId, TrackItem};
use retailops_shipments::ShipmentId;

/// The one inventory operation the receiving flow depends on.
pub trait StockRestocker {
    /// Increase stock of `item_id` by `quantity` (zero is a valid, recorded no-op).
    fn restock(
        &mut self,
        item_id: &StockItemId,
        quantity: i64,
        shipment_id: ShipmentId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()>;
}

impl<R> StockRestocker for &mut R
where
    R: StockRestocker + ?Sized,
{
    fn restock(
        &mut self,
        item_id: &StockItemId,
        quantity: i64,
        shipment_id: ShipmentId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        (**self).restock(item_id, quantity, shipment_id, occurred_at)
    }
}

/// In-memory inventory for tests/dev.
///
/// Keeps one `StockItem` aggregate per store/product, tracking it on first
/// restock, and the full list of applied events.
#[derive(Debug, Default, Clone)]
pub struct InMemoryInventory {
    items: HashMap<StockItemId, StockItem>,
    events: Vec<InventoryEvent>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stock; untracked items report zero.
    pub fn stock_level(&self, item_id: &StockItemId) -> i64 {
        self.items.get(item_id).map(StockItem::stock).unwrap_or(0)
    }

    pub fn item(&self, item_id: &StockItemId) -> Option<&StockItem> {
        self.items.get(item_id)
    }

    /// Every applied inventory event, oldest first.
    pub fn events(&self) -> &[InventoryEvent] {
        &self.events
    }

    /// Quantities restocked for one item, oldest first.
    pub fn restocks_of(&self, item_id: &StockItemId) -> Vec<i64> {
        self.events
            .iter()
            .filter_map(|event| match event {
                InventoryEvent::StockRestocked(e) if &e.item_id == item_id => Some(e.quantity),
                _ => None,
            })
            .collect()
    }

    fn execute(&mut self, item_id: &StockItemId, command: InventoryCommand) -> DomainResult<()> {
        let item = self
            .items
            .entry(item_id.clone())
            .or_insert_with(|| StockItem::empty(item_id.clone()));
        let events = item.execute(&command)?;
        self.events.extend(events);
        Ok(())
    }
}

impl StockRestocker for InMemoryInventory {
    fn restock(
        &mut self,
        item_id: &StockItemId,
        quantity: i64,
        shipment_id: ShipmentId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let tracked = self.items.get(item_id).is_some_and(StockItem::is_tracked);
        if !tracked {
            self.execute(
                item_id,
                InventoryCommand::TrackItem(TrackItem {
                    item_id: item_id.clone(),
                    occurred_at,
                }),
            )?;
        }

        self.execute(
            item_id,
            InventoryCommand::Restock(Restock {
                item_id: item_id.clone(),
                quantity,
                shipment_id: Some(shipment_id.0),
                occurred_at,
            }),
        )?;

        tracing::debug!(item = %item_id, quantity, "stock restocked");
        Ok(())
    }
}
