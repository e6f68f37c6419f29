use std::sync::Arc;

use tracing::info;

use super::fetch_table_items;
use crate::cache::ManifestCache;
use crate::config::SyncConfig;
use crate::core::error::Error;
use crate::core::manifest::Manifest;
use crate::remote::{BulkUploader, BungieClient, KvClient};
use crate::task_group::run_blocking;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SyncReport {
    pub tables: usize,
    pub items: usize,
    pub chunks: usize,
}

/// Uploads every entry of the shard's tables using the manifest cached by `plan`.
pub async fn sync(config: &SyncConfig) -> Result<SyncReport, Error> {
    let cache = ManifestCache::new(&config.cache_dir);
    let locale = config.bungie.locale.clone();
    let manifest =
        run_blocking(move || Manifest::from_response(cache.load()?, &locale)).await?;
    for table in &config.tables {
        manifest.table_path(table)?;
    }

    let client = BungieClient::new(&config.bungie)?;
    let uploader = BulkUploader::new(
        KvClient::new(&config.kv)?,
        config.max_bulk_items,
        config.concurrency,
    );

    let fetched = fetch_table_items(
        &client,
        Arc::new(manifest),
        config.tables.clone(),
        config.concurrency,
    )
    .await?;

    let items: Vec<_> = fetched
        .into_iter()
        .flat_map(|table| table.items)
        .collect();
    let listing: String = config
        .tables
        .iter()
        .map(|name| format!("\n- {name}"))
        .collect();
    info!("{} items in the following tables:{listing}", items.len());

    let upload = uploader.upload(items).await?;
    Ok(SyncReport {
        tables: config.tables.len(),
        items: upload.items,
        chunks: upload.chunks,
    })
}
