pub mod error;
pub mod job;
pub mod record;
pub mod source;

pub use error::{CoreError, CoreErrorKind};
pub use job::JobState;
pub use record::{NasaRecord, NewsRecord, Record, WeatherRecord};
pub use source::SourceId;
