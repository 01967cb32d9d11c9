use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;

use crate::models::Record;
use crate::sink::{Sink, SinkResult, closed_error, storage_error};

/// Keeps a pretty-printed JSON array on disk; each append re-reads the array,
/// extends it and rewrites the file.
pub struct JsonFileSink {
    path: PathBuf,
    state: Mutex<bool>,
}

impl JsonFileSink {
    pub fn open(path: impl Into<PathBuf>) -> SinkResult<Self> {
        let path = path.into();
        if !path.exists() {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent).map_err(|e| storage_error(&path, "create", e))?;
            }
            fs::write(&path, "[]").map_err(|e| storage_error(&path, "create", e))?;
        }
        Ok(Self {
            path,
            state: Mutex::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_existing(&self) -> SinkResult<Vec<Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(storage_error(&self.path, "read", error)),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&content)
            .map_err(|e| storage_error(&self.path, "parse", e))?
        {
            Value::Array(items) => Ok(items),
            _ => Err(storage_error(
                &self.path,
                "parse",
                "existing content is not a JSON array",
            )),
        }
    }
}

impl Sink for JsonFileSink {
    fn append(&self, records: &[Record]) -> SinkResult<()> {
        let closed = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *closed {
            return Err(closed_error(&self.path));
        }
        if records.is_empty() {
            return Ok(());
        }

        let mut items = self.read_existing()?;
        for record in records {
            let value =
                serde_json::to_value(record).map_err(|e| storage_error(&self.path, "encode", e))?;
            items.push(value);
        }
        let rendered = serde_json::to_string_pretty(&items)
            .map_err(|e| storage_error(&self.path, "encode", e))?;
        fs::write(&self.path, rendered).map_err(|e| storage_error(&self.path, "write", e))?;

        tracing::info!(
            path = %self.path.display(),
            appended = records.len(),
            total = items.len(),
            "records saved"
        );
        Ok(())
    }

    fn close(&self) -> SinkResult<()> {
        let mut closed = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *closed = true;
        Ok(())
    }
}
