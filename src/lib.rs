//! Purpose: Library behind the `manifest-kv-sync` CI commands.
//! Exports: `core` (pure chunking/sharding/manifest logic), clients, cache, outputs, pipelines.
//! Role: The binary parses flags into `config::Settings` and calls into `pipeline`.
//! Invariants: Pure planning lives in `core`; all network I/O lives in `remote`.
//! Invariants: Every fallible operation returns `core::error::Error`; nothing retries.
pub mod cache;
pub mod config;
pub mod core;
pub mod logging;
pub mod outputs;
pub mod pipeline;
pub mod remote;
pub mod task_group;

pub use crate::core::error::{Error, ErrorKind, to_exit_code};
