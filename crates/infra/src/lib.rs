//! Infrastructure layer: reconciliation orchestration, collaborator adapters,
//! configuration, supplier record loading and the audit trail.

pub mod audit;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod reconciliation;
pub mod supplier_file;

#[cfg(test)]
mod integration_tests;

pub use audit::AuditLog;
pub use collaborators::{InMemoryInventory, InMemoryProductCatalog, ProductCatalog, StockRestocker};
pub use config::ReconciliationConfig;
pub use error::ReconciliationError;
pub use reconciliation::{ReconciliationService, VerificationReport};
pub use supplier_file::{SupplierFileError, SupplierRecord};
