//! Purpose: Local manifest cache directory shared between the plan and sync steps.
//! Exports: `ManifestCache`.
//! Role: The CI platform restores/saves the directory; this module reads and writes its files.
//! Invariants: `manifest.json` holds the raw manifest body; `cache-key` holds the key it was saved under.
//! Invariants: A lookup only hits when both files exist and the key matches exactly.
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::core::error::{Error, ErrorKind};

const MANIFEST_FILE: &str = "manifest.json";
const KEY_FILE: &str = "cache-key";

#[derive(Clone, Debug)]
pub struct ManifestCache {
    dir: PathBuf,
}

impl ManifestCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    fn key_path(&self) -> PathBuf {
        self.dir.join(KEY_FILE)
    }

    pub fn lookup(&self, key: &str) -> Result<bool, Error> {
        if !self.manifest_path().is_file() {
            return Ok(false);
        }
        let key_path = self.key_path();
        match fs::read_to_string(&key_path) {
            Ok(stored) => Ok(stored.trim() == key),
            Err(err) if err.kind() == IoErrorKind::NotFound => Ok(false),
            Err(err) => Err(Error::new(ErrorKind::Io)
                .with_message("failed to read cache key")
                .with_path(key_path)
                .with_source(err)),
        }
    }

    pub fn save(&self, key: &str, body: &Value) -> Result<(), Error> {
        fs::create_dir_all(&self.dir).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to create cache directory")
                .with_path(&self.dir)
                .with_source(err)
        })?;
        let pretty = serde_json::to_string_pretty(body).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode manifest")
                .with_source(err)
        })?;
        write_file(&self.manifest_path(), &pretty)?;
        write_file(&self.key_path(), key)
    }

    pub fn load(&self) -> Result<Value, Error> {
        let path = self.manifest_path();
        let text = fs::read_to_string(&path).map_err(|err| {
            let kind = if err.kind() == IoErrorKind::NotFound {
                ErrorKind::NotFound
            } else {
                ErrorKind::Io
            };
            Error::new(kind)
                .with_message("failed to read cached manifest")
                .with_path(&path)
                .with_hint("Restore the manifest cache produced by the plan step.")
                .with_source(err)
        })?;
        serde_json::from_str(&text).map_err(|err| {
            Error::new(ErrorKind::ResponseParse)
                .with_message("cached manifest is not valid JSON")
                .with_path(&path)
                .with_source(err)
        })
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), Error> {
    fs::write(path, contents).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write cache file")
            .with_path(path)
            .with_source(err)
    })
}
