use std::collections::HashMap;

use retailops_core::Entity;
use retailops_products::{Product, ProductId};

/// Product lookup, owned by the catalog module.
pub trait ProductCatalog {
    /// Resolve a product id to its catalog record.
    fn product(&self, product_id: &ProductId) -> Option<Product>;

    fn contains(&self, product_id: &ProductId) -> bool {
        self.product(product_id).is_some()
    }
}

impl<C> ProductCatalog for &C
where
    C: ProductCatalog + ?Sized,
{
    fn product(&self, product_id: &ProductId) -> Option<Product> {
        (**self).product(product_id)
    }
}

/// In-memory catalog for tests/dev.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProductCatalog {
    products: HashMap<ProductId, Product>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a catalog record.
    pub fn insert(&mut self, product: Product) {
        self.products.insert(product.id().clone(), product);
    }

    pub fn with(mut self, product: Product) -> Self {
        self.insert(product);
        self
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl FromIterator<Product> for InMemoryProductCatalog {
    fn from_iter<T: IntoIterator<Item = Product>>(iter: T) -> Self {
        let mut catalog = Self::new();
        for product in iter {
            catalog.insert(product);
        }
        catalog
    }
}

impl ProductCatalog for InMemoryProductCatalog {
    fn product(&self, product_id: &ProductId) -> Option<Product> {
        self.products.get(product_id).cloned()
    }
}
