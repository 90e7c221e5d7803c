use thiserror::Error;

/// Application-level failure carrying the process exit code.
///
/// Exit codes: `2` for bad input or configuration, `3` for datasets that fail their
/// contract, `4` for runtime and external failures.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failure of a single valuation call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValuationError {
    #[error("Invalid age '{age}': expected a non-negative whole number of years")]
    InvalidAge { age: String },

    #[error("Cannot price an animal whose sex is unknown")]
    UnknownSex,

    #[error("Pricing constants overflow the price range")]
    Overflow,
}

/// Failure of a detector call. The normalizer degrades the affected field instead of
/// propagating these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectorError {
    #[error("Detector unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed detector response: {0}")]
    Malformed(String),

    #[error("No detector model configured for {0}")]
    NotConfigured(&'static str),
}

impl From<ValuationError> for AppError {
    fn from(value: ValuationError) -> Self {
        AppError::new(2, value.to_string())
    }
}

impl From<DetectorError> for AppError {
    fn from(value: DetectorError) -> Self {
        AppError::new(4, value.to_string())
    }
}
