//! Purpose: Publish step outputs for the CI runner.
//! Exports: `StepOutputs`.
//! Role: Appends `name=value` lines to the runner's output file and renders the same pairs as JSON.
//! Invariants: Output-file lines keep insertion order.
//! Invariants: Non-string values are written as compact single-line JSON.
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use serde_json::{Map, Value};

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, Default)]
pub struct StepOutputs {
    entries: Vec<(String, Value)>,
}

impl StepOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.entries.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// `name=value` lines in the runner's output-file format.
    pub fn to_output_lines(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.entries {
            let rendered = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            out.push_str(name);
            out.push('=');
            out.push_str(&rendered);
            out.push('\n');
        }
        out
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (name, value) in &self.entries {
            map.insert(name.clone(), value.clone());
        }
        Value::Object(map)
    }

    pub fn append_to(&self, path: &Path) -> Result<(), Error> {
        let io_error = |err: std::io::Error| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write step outputs")
                .with_path(path)
                .with_source(err)
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_error)?;
        file.write_all(self.to_output_lines().as_bytes())
            .map_err(io_error)
    }
}
