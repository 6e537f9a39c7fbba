use anyhow::Context;

use retailops_infra::supplier_file::load_suppliers;
use retailops_infra::{
    InMemoryInventory, InMemoryProductCatalog, ReconciliationConfig, ReconciliationService,
};
use retailops_suppliers::SupplierRegistry;

fn main() -> anyhow::Result<()> {
    retailops_observability::init();

    let config = ReconciliationConfig::from_env();
    let records = match &config.suppliers_file {
        Some(path) => load_suppliers(path, config.supplier_delimiter)
            .with_context(|| format!("loading suppliers from {}", path.display()))?,
        None => {
            tracing::warn!("RETAILOPS_SUPPLIERS_FILE not set; starting with no suppliers");
            Vec::new()
        }
    };

    let mut service = ReconciliationService::new(
        config,
        SupplierRegistry::new(),
        InMemoryProductCatalog::new(),
        InMemoryInventory::new(),
    )?;
    let registered = service.register_suppliers(records)?;
    tracing::info!(
        suppliers = registered,
        store = %service.current_store(),
        "reconciliation service ready"
    );

    println!("{}", serde_json::to_string_pretty(&service.ratings_snapshot())?);

    Ok(())
}
