mod csv;
mod json;

use std::path::Path;
use std::sync::Arc;

use crate::config::OutputFormat;
use crate::models::{CoreError, CoreErrorKind, Record};

pub use self::csv::CsvFileSink;
pub use self::json::JsonFileSink;

pub type SinkResult<T> = Result<T, CoreError>;

/// Destination for fetched records. Implementations serialize concurrent
/// appends internally; `close` is called once by the scheduler at shutdown.
pub trait Sink: Send + Sync {
    fn append(&self, records: &[Record]) -> SinkResult<()>;

    fn close(&self) -> SinkResult<()>;
}

pub fn create_sink(format: OutputFormat, path: impl AsRef<Path>) -> SinkResult<Arc<dyn Sink>> {
    let path = path.as_ref();
    let sink: Arc<dyn Sink> = match format {
        OutputFormat::Json => Arc::new(JsonFileSink::open(path)?),
        OutputFormat::Csv => Arc::new(CsvFileSink::open(path)?),
    };
    tracing::info!(format = format.as_str(), path = %path.display(), "output sink ready");
    Ok(sink)
}

fn storage_error(path: &Path, action: &str, error: impl std::fmt::Display) -> CoreError {
    CoreError::new(
        CoreErrorKind::StorageFailure,
        format!("failed to {action} '{}': {error}", path.display()),
    )
}

fn closed_error(path: &Path) -> CoreError {
    CoreError::new(
        CoreErrorKind::StorageFailure,
        format!("sink for '{}' is already closed", path.display()),
    )
}
