//! Ports to the collaborators the reconciliation flow depends on, plus
//! in-memory adapters for tests and local runs.

pub mod catalog;
pub mod inventory;

pub use catalog::{InMemoryProductCatalog, ProductCatalog};
pub use inventory::{InMemoryInventory, StockRestocker};
