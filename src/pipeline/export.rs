use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use super::{TableItems, fetch_table_items, select_tables};
use crate::config::ExportConfig;
use crate::core::chunk::{chunk, chunk_spans};
use crate::core::error::{Error, ErrorKind};
use crate::remote::BungieClient;
use crate::task_group::run_blocking;

#[derive(Clone, Debug, Default)]
pub struct ExportReport {
    pub manifest_version: String,
    pub tables: usize,
    pub files: Vec<PathBuf>,
}

/// Writes every table as `{table}__{first}-{last}.json` batches under the output directory.
pub async fn export(config: &ExportConfig) -> Result<ExportReport, Error> {
    let client = BungieClient::new(&config.bungie)?;
    let manifest_client = client.clone();
    let manifest = run_blocking(move || manifest_client.fetch_manifest()).await?;
    let tables = select_tables(&manifest, &config.skipped_tables);

    let output_dir = config.output_dir.clone();
    run_blocking(move || {
        fs::create_dir_all(&output_dir).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to create export directory")
                .with_path(&output_dir)
                .with_source(err)
        })
    })
    .await?;

    let manifest_version = manifest.version().to_string();
    let table_count = tables.len();
    let fetched = fetch_table_items(&client, Arc::new(manifest), tables, config.concurrency).await?;

    let output_dir = config.output_dir.clone();
    let max_items = config.max_bulk_items;
    let files = run_blocking(move || write_batches(&output_dir, &fetched, max_items)).await?;

    Ok(ExportReport {
        manifest_version,
        tables: table_count,
        files,
    })
}

fn write_batches(
    output_dir: &Path,
    fetched: &[TableItems],
    max_items: usize,
) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    for table in fetched {
        let chunks = chunk(&table.items, max_items)?;
        for (span, items) in chunk_spans(&chunks).into_iter().zip(&chunks) {
            let path = output_dir.join(format!("{}__{}-{}.json", table.table, span.first, span.last));
            info!("Writing {}", path.display());
            let body = serde_json::to_string_pretty(items).map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to encode export batch")
                    .with_table(table.table.clone())
                    .with_source(err)
            })?;
            fs::write(&path, body).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to write export batch")
                    .with_path(&path)
                    .with_source(err)
            })?;
            files.push(path);
        }
    }
    Ok(files)
}
