use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CoreErrorKind {
    Configuration,
    InvalidInput,
    Transport,
    HttpStatus,
    ParseFailure,
    Timeout,
    Cancelled,
    StorageFailure,
    Internal,
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{kind:?}: {message}")]
pub struct CoreError {
    pub source_name: Option<String>,
    pub kind: CoreErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            source_name: None,
            kind,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Configuration, message)
    }

    /// Attributes the error to a source unless it already names one.
    pub fn attributed_to(mut self, source_name: &str) -> Self {
        if self.source_name.is_none() {
            self.source_name = Some(source_name.to_string());
        }
        self
    }
}
