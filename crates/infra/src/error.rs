//! Errors surfaced by the reconciliation service.

use thiserror::Error;

use retailops_core::DomainError;
use retailops_products::ProductId;

#[derive(Debug, Error)]
pub enum ReconciliationError {
    /// Unknown supplier, shipment or product.
    #[error("not found: {0}")]
    NotFound(String),
    /// Rejected input (non-positive quantity, negative count, bad identifier).
    #[error("validation failed: {0}")]
    Validation(String),
    /// The operation is not allowed in the shipment's current state.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    /// The operation was already performed (e.g. verifying a verified shipment).
    #[error("conflict: {0}")]
    Conflict(String),
    /// The inventory collaborator refused a restock mid-verification.
    ///
    /// Lines before `product_id` have already been restocked; the shipment
    /// stays unverified and the supplier is not rated.
    #[error("restock of {product_id} failed: {source}")]
    Restock {
        product_id: ProductId,
        #[source]
        source: DomainError,
    },
}

impl From<DomainError> for ReconciliationError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ReconciliationError::Validation(msg),
            DomainError::InvalidId(msg) => ReconciliationError::Validation(msg),
            DomainError::InvariantViolation(msg) => ReconciliationError::InvariantViolation(msg),
            DomainError::NotFound(msg) => ReconciliationError::NotFound(msg),
            DomainError::Conflict(msg) => ReconciliationError::Conflict(msg),
        }
    }
}

impl ReconciliationError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReconciliationError::NotFound(_))
    }
}
