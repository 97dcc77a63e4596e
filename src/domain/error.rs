//! Domain error types.

/// Top-level error type for qqetrader.
#[derive(Debug, thiserror::Error)]
pub enum QqetraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no signal data for {code}")]
    NoData { code: String },

    #[error("insufficient history for {code}: have {bars} bars, need {minimum}")]
    InsufficientData {
        code: String,
        bars: usize,
        minimum: usize,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&QqetraderError> for std::process::ExitCode {
    fn from(err: &QqetraderError) -> Self {
        let code: u8 = match err {
            QqetraderError::Io(_) => 1,
            QqetraderError::ConfigParse { .. }
            | QqetraderError::ConfigMissing { .. }
            | QqetraderError::ConfigInvalid { .. } => 2,
            QqetraderError::Data { .. }
            | QqetraderError::NoData { .. }
            | QqetraderError::InsufficientData { .. } => 3,
            QqetraderError::Report { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
