//! Purpose: HTTP clients for the two external APIs the pipelines talk to.
//! Exports: `BungieClient`, `KvClient`, `BulkUploader`, `UploadReport`.
//! Role: Blocking transport layer; callers fan out through `task_group`.
//! Invariants: No retries are built in; every failure surfaces to the caller.

mod bungie;
mod http;
mod kv;

pub use bungie::{BungieClient, PLATFORM_SUCCESS};
pub use kv::{BulkUploader, KvClient, UploadReport};
