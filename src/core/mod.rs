// Pure building blocks: errors, chunking, sharding, manifest identity, KV items.
pub mod chunk;
pub mod error;
pub mod kv_item;
pub mod manifest;
pub mod shard;
