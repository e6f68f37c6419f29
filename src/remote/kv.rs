//! Purpose: Bulk-write key/value items to the external key-value namespace.
//! Exports: `KvClient`, `BulkUploader`, `UploadReport`.
//! Role: Bulk Uploader; chunks items and issues one PUT per chunk, bounded in parallel.
//! Invariants: A chunk fails unless status is 200 and any JSON object body has `success: true`.
//! Invariants: Any failed chunk fails the whole upload; there is no partial bookkeeping.
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::info;
use url::Url;

use super::http::{self, HttpResponse};
use crate::config::KvConfig;
use crate::core::chunk::{ChunkSpan, chunk, chunk_spans};
use crate::core::error::{Error, ErrorKind};
use crate::core::kv_item::KvItem;
use crate::task_group::run_bounded;

#[derive(Clone)]
pub struct KvClient {
    inner: Arc<KvClientInner>,
}

struct KvClientInner {
    bulk_url: Url,
    token: String,
    agent: ureq::Agent,
}

impl KvClient {
    pub fn new(config: &KvConfig) -> Result<Self, Error> {
        let base_url = http::parse_base_url(&config.base_url)?;
        let bulk_url = http::extend_url(
            &base_url,
            &[
                "accounts",
                &config.account_id,
                "storage",
                "kv",
                "namespaces",
                &config.namespace_id,
                "bulk",
            ],
        )?;
        Ok(Self {
            inner: Arc::new(KvClientInner {
                bulk_url,
                token: config.api_token.clone(),
                agent: ureq::AgentBuilder::new().build(),
            }),
        })
    }

    pub fn bulk_url(&self) -> &Url {
        &self.inner.bulk_url
    }

    pub fn put_bulk(&self, items: &[KvItem]) -> Result<(), Error> {
        let payload = serde_json::to_string(items).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode bulk payload")
                .with_source(err)
        })?;
        let request = self
            .inner
            .agent
            .put(self.inner.bulk_url.as_str())
            .set("Content-Type", "application/json")
            .set("Authorization", &format!("Bearer {}", self.inner.token));
        let response = http::send(request, Some(&payload))?;
        check_bulk_response(&response)
    }
}

fn check_bulk_response(response: &HttpResponse) -> Result<(), Error> {
    let value = http::parse_json(response)?;
    if value.is_object() && value.get("success").and_then(Value::as_bool) != Some(true) {
        return Err(Error::new(ErrorKind::UploadRejected)
            .with_message(format!(
                "response.success was not `true`: {}",
                response.body_preview()
            ))
            .with_status(response.status)
            .with_url(response.url.clone()));
    }
    if response.status != 200 {
        return Err(Error::new(ErrorKind::UploadRejected)
            .with_message(format!("bulk write returned status {}", response.status))
            .with_status(response.status)
            .with_url(response.url.clone()));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct UploadReport {
    pub items: usize,
    pub chunks: usize,
}

pub struct BulkUploader {
    client: KvClient,
    max_items: usize,
    concurrency: usize,
}

impl BulkUploader {
    pub fn new(client: KvClient, max_items: usize, concurrency: usize) -> Self {
        Self {
            client,
            max_items,
            concurrency,
        }
    }

    pub async fn upload(&self, items: Vec<KvItem>) -> Result<UploadReport, Error> {
        let spans = chunk_spans(&chunk(&items, self.max_items)?);
        let report = UploadReport {
            items: items.len(),
            chunks: spans.len(),
        };
        let total = spans.len();
        let items = Arc::new(items);
        let client = self.client.clone();

        run_bounded(self.concurrency, spans, move |span: ChunkSpan| {
            let started = Instant::now();
            client.put_bulk(&items[span.first - 1..span.last])?;
            info!(
                "{} of {}: items {}-{} ({} ms)",
                span.index + 1,
                total,
                span.first,
                span.last,
                started.elapsed().as_millis()
            );
            Ok(())
        })
        .await?;

        Ok(report)
    }
}
