//! Configuration loading and representation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use retailops_core::{DomainResult, StoreId};

pub const ENV_REQUIRE_CONFIRMATION: &str = "RETAILOPS_REQUIRE_CONFIRMATION";
pub const ENV_STORE: &str = "RETAILOPS_STORE";
pub const ENV_SUPPLIERS_FILE: &str = "RETAILOPS_SUPPLIERS_FILE";
pub const ENV_SUPPLIER_DELIMITER: &str = "RETAILOPS_SUPPLIER_DELIMITER";

/// Settings for the receiving/reconciliation flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Only confirmed shipments may be verified when set.
    pub require_confirmation: bool,
    /// Store selected when the service starts.
    pub initial_store: String,
    /// Supplier records file loaded at startup, if any.
    pub suppliers_file: Option<PathBuf>,
    /// Field delimiter of the supplier records file.
    pub supplier_delimiter: char,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            require_confirmation: false,
            initial_store: "store-1".to_string(),
            suppliers_file: None,
            supplier_delimiter: ',',
        }
    }
}

impl ReconciliationConfig {
    /// Read settings from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    ///
    /// Unparseable values are logged and replaced by the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_REQUIRE_CONFIRMATION) {
            match parse_flag(&raw) {
                Some(flag) => config.require_confirmation = flag,
                None => tracing::warn!(
                    "{ENV_REQUIRE_CONFIRMATION}={raw:?} is not a boolean; using {}",
                    config.require_confirmation
                ),
            }
        }

        if let Some(store) = lookup(ENV_STORE) {
            if store.trim().is_empty() {
                tracing::warn!("{ENV_STORE} is blank; using {}", config.initial_store);
            } else {
                config.initial_store = store.trim().to_string();
            }
        }

        if let Some(path) = lookup(ENV_SUPPLIERS_FILE).filter(|p| !p.trim().is_empty()) {
            config.suppliers_file = Some(PathBuf::from(path.trim()));
        }

        if let Some(raw) = lookup(ENV_SUPPLIER_DELIMITER) {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(delimiter), None) => config.supplier_delimiter = delimiter,
                _ => tracing::warn!(
                    "{ENV_SUPPLIER_DELIMITER}={raw:?} is not a single character; using {:?}",
                    config.supplier_delimiter
                ),
            }
        }

        config
    }

    /// The configured initial store as a validated id.
    pub fn initial_store_id(&self) -> DomainResult<StoreId> {
        StoreId::parse(&self.initial_store)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
