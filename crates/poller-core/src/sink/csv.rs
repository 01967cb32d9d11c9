use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::models::Record;
use crate::sink::{Sink, SinkResult, closed_error, storage_error};

/// Appends records as CSV rows. A header row is emitted the first time each
/// distinct column set is seen by this sink.
pub struct CsvFileSink {
    path: PathBuf,
    state: Mutex<CsvState>,
}

#[derive(Default)]
struct CsvState {
    written_headers: HashSet<Vec<&'static str>>,
    closed: bool,
}

impl CsvFileSink {
    pub fn open(path: impl Into<PathBuf>) -> SinkResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| storage_error(&path, "create", e))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| storage_error(&path, "create", e))?;
        Ok(Self {
            path,
            state: Mutex::new(CsvState::default()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_for_append(&self) -> SinkResult<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| storage_error(&self.path, "open", e))
    }
}

impl Sink for CsvFileSink {
    fn append(&self, records: &[Record]) -> SinkResult<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.closed {
            return Err(closed_error(&self.path));
        }
        if records.is_empty() {
            return Ok(());
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::CRLF)
            .from_writer(Vec::new());
        let mut new_headers = Vec::new();
        for record in records {
            let columns = record.columns();
            let headers: Vec<&'static str> = columns.iter().map(|(header, _)| *header).collect();
            if !state.written_headers.contains(&headers) && !new_headers.contains(&headers) {
                writer
                    .write_record(&headers)
                    .map_err(|e| storage_error(&self.path, "encode", e))?;
                new_headers.push(headers);
            }
            writer
                .write_record(columns.iter().map(|(_, value)| value.as_str()))
                .map_err(|e| storage_error(&self.path, "encode", e))?;
        }
        let buffer = writer
            .into_inner()
            .map_err(|e| storage_error(&self.path, "encode", e.error()))?;

        let mut file = self.open_for_append()?;
        file.write_all(&buffer)
            .and_then(|()| file.flush())
            .map_err(|e| storage_error(&self.path, "write", e))?;
        state.written_headers.extend(new_headers);

        tracing::info!(
            path = %self.path.display(),
            appended = records.len(),
            "records saved"
        );
        Ok(())
    }

    fn close(&self) -> SinkResult<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.closed = true;
        Ok(())
    }
}
