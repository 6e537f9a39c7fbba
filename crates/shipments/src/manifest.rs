//! Manifest lines, received counts and the comparison between them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use retailops_core::{DomainError, DomainResult, ValueObject};
use retailops_products::ProductId;

/// One expected product on a shipment's manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestLine {
    pub line_no: u32,
    pub product_id: ProductId,
    pub expected_quantity: i64,
}

/// Physically counted quantities per product, as entered at the receiving dock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceivedQuantities(BTreeMap<ProductId, i64>);

impl ValueObject for ReceivedQuantities {}

impl ReceivedQuantities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, product_id: ProductId, quantity: i64) -> Self {
        self.0.insert(product_id, quantity);
        self
    }

    /// Record a count; a later count for the same product replaces the earlier one.
    pub fn insert(&mut self, product_id: ProductId, quantity: i64) {
        self.0.insert(product_id, quantity);
    }

    /// Counted quantity for a product, or `0` when it was not counted at all.
    ///
    /// An uncounted product is treated as nothing received, so it shows up as
    /// a discrepancy rather than as "not checked".
    pub fn quantity_or_zero(&self, product_id: &ProductId) -> i64 {
        self.0.get(product_id).copied().unwrap_or(0)
    }

    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.0.contains_key(product_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProductId, i64)> {
        self.0.iter().map(|(id, qty)| (id, *qty))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Counts cannot be negative.
    pub fn validate(&self) -> DomainResult<()> {
        match self.0.iter().find(|(_, qty)| **qty < 0) {
            Some((product_id, qty)) => Err(DomainError::validation(format!(
                "received quantity for {product_id} cannot be negative (got {qty})"
            ))),
            None => Ok(()),
        }
    }
}

impl FromIterator<(ProductId, i64)> for ReceivedQuantities {
    fn from_iter<T: IntoIterator<Item = (ProductId, i64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Outcome of comparing one manifest line against the received count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledLine {
    pub line_no: u32,
    pub product_id: ProductId,
    pub expected: i64,
    pub received: i64,
}

impl ReconciledLine {
    /// Signed `received - expected`; zero means the line matched.
    pub fn difference(&self) -> i64 {
        self.received - self.expected
    }

    pub fn is_discrepant(&self) -> bool {
        self.received != self.expected
    }
}

/// Compare every manifest line, in manifest order, against the received counts.
pub fn reconcile(manifest: &[ManifestLine], received: &ReceivedQuantities) -> Vec<ReconciledLine> {
    manifest
        .iter()
        .map(|line| ReconciledLine {
            line_no: line.line_no,
            product_id: line.product_id.clone(),
            expected: line.expected_quantity,
            received: received.quantity_or_zero(&line.product_id),
        })
        .collect()
}
