use serde::{Deserialize, Serialize};

use retailops_core::{DomainError, DomainResult, Entity, ValueObject, impl_code_newtype};

/// Product identifier (catalog code, e.g. a SKU or PLU).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl_code_newtype!(ProductId, "ProductId");

/// Pricing metadata attached to a catalog record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingMetadata {
    pub base_price: Option<u64>, // Price in smallest currency unit (e.g., cents)
    pub currency: Option<String>, // ISO currency code (e.g., "USD", "EUR")
}

impl ValueObject for PricingMetadata {}

impl PricingMetadata {
    pub fn priced(base_price: u64, currency: impl Into<String>) -> Self {
        Self {
            base_price: Some(base_price),
            currency: Some(currency.into()),
        }
    }
}

/// Catalog record for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    pricing: PricingMetadata,
}

impl Product {
    /// Build a catalog record. The name must not be blank.
    pub fn new(id: ProductId, name: impl Into<String>, pricing: PricingMetadata) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if pricing.base_price.is_some() && pricing.currency.as_deref().is_none_or(|c| c.trim().is_empty()) {
            return Err(DomainError::validation("priced products need a currency"));
        }

        Ok(Self {
            id,
            name: name.trim().to_string(),
            pricing,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pricing(&self) -> &PricingMetadata {
        &self.pricing
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
