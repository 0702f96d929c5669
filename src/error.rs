/// Fatal errors that stop a blackbox log from being decoded.
///
/// Corrupt or desynchronised frames are not errors: the parser counts them,
/// reports them to the listener and carries on. Everything here means the
/// log (or its container) cannot be interpreted at all.
#[derive(Debug, thiserror::Error)]
pub enum BBLError {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended while still reading headers
    #[error("data file contained no frames")]
    NoFrames,

    /// A data frame appeared before any main-frame field names were declared
    #[error("data file is missing field name definitions")]
    MissingFieldDefinitions,

    /// A field declares an encoding id this decoder does not implement
    #[error("unsupported field encoding {id} for field {field} of '{frame}' frames")]
    UnsupportedEncoding { frame: char, field: usize, id: u32 },

    /// A field declares a predictor id this decoder does not implement
    #[error("unsupported field predictor {id} for field {field} of '{frame}' frames")]
    UnsupportedPredictor { frame: char, field: usize, id: u32 },

    /// A predictor depends on a well-known field the log never defines
    #[error("field {field} of '{frame}' frames is predicted from {reference}, which is not defined")]
    UndefinedFieldReference {
        frame: char,
        field: usize,
        reference: &'static str,
    },

    /// No log start marker was found in a multi-log container
    #[error("no blackbox log headers found in data")]
    NoLogsFound,
}

impl BBLError {
    /// True when the log declares a format variant this decoder cannot interpret.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            BBLError::MissingFieldDefinitions
                | BBLError::UnsupportedEncoding { .. }
                | BBLError::UnsupportedPredictor { .. }
                | BBLError::UndefinedFieldReference { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BBLError>;
