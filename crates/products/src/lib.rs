//! Products catalog module.
//!
//! The catalog itself is owned elsewhere; this crate only defines the product
//! record the back-office modules resolve product identifiers to.

pub mod product;

pub use product::{PricingMetadata, Product, ProductId};
