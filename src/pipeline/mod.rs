//! Purpose: Orchestrate the `plan`, `sync`, and `export` runs.
//! Exports: `plan`, `sync`, `export` and their report types.
//! Role: Glue between config, remote clients, the cache, and the pure core.
//! Invariants: Each run validates its inputs before the first network request.
//! Invariants: The first error aborts the run; nothing is rolled back.
use std::sync::Arc;

use tracing::{debug, info};

use crate::core::error::Error;
use crate::core::kv_item::{KvItem, kv_items_from_table};
use crate::core::manifest::Manifest;
use crate::remote::BungieClient;
use crate::task_group::run_bounded;

mod export;
mod plan;
mod sync;

pub use export::{ExportReport, export};
pub use plan::{PlanReport, plan};
pub use sync::{SyncReport, sync};

/// Manifest tables minus the skip list, sorted.
pub(crate) fn select_tables(manifest: &Manifest, skipped: &[String]) -> Vec<String> {
    let mut tables: Vec<String> = manifest
        .table_names()
        .filter(|table| {
            if skipped.iter().any(|name| name == table) {
                debug!("Skipping table {table}");
                return false;
            }
            true
        })
        .map(str::to_string)
        .collect();
    tables.sort();
    tables
}

pub(crate) struct TableItems {
    pub table: String,
    pub items: Vec<KvItem>,
}

/// Fetches tables in parallel; results keep the order of `tables`.
pub(crate) async fn fetch_table_items(
    client: &BungieClient,
    manifest: Arc<Manifest>,
    tables: Vec<String>,
    concurrency: usize,
) -> Result<Vec<TableItems>, Error> {
    let client = client.clone();
    run_bounded(concurrency, tables, move |table: String| {
        let entries = client.fetch_table(&manifest, &table)?;
        let items = kv_items_from_table(&table, &entries)?;
        info!(
            "Table {table} contains {} entr{}",
            items.len(),
            if items.len() == 1 { "y" } else { "ies" }
        );
        Ok(TableItems { table, items })
    })
    .await
}
