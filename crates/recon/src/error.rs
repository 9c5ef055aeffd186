use thiserror::Error;

/// Dataset-level failures. Row-level problems never surface here: a bad date
/// or amount degrades to `None` / 0 inside the normalizer.
#[derive(Debug, Error)]
pub enum ReconError {
    /// The raw payment data could not be obtained (network or file error).
    #[error("payment data unavailable: {0}")]
    SourceUnavailable(String),
    /// The raw data was obtained but has no recognizable column structure.
    #[error("payment data malformed: {0}")]
    SourceMalformed(String),
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad fee, cutoff day, conflicting sources, ...).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
}
