use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::{ReportSettings, DEFAULT_MONTHLY_FEE_MINOR, DEFAULT_ON_TIME_DAY};
use crate::error::ReconError;
use crate::model::GroupingKey;
use crate::money::parse_amount;
use crate::normalize::{default_date_formats, CsvLayout};

/// How long a fetched dataset stays fresh (ten minutes).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Report configuration, normally read from `config.toml`. Every key is
/// optional; an empty document yields the defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Monthly fee in rupiah: `1000000`, `"1000000"` or `"Rp1.000.000"`.
    #[serde(default)]
    pub monthly_fee: Option<FeeSpec>,
    #[serde(default = "default_on_time_day")]
    pub on_time_day: u32,
    #[serde(default)]
    pub grouping: GroupingKey,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub parse: ParseConfig,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            monthly_fee: None,
            on_time_day: DEFAULT_ON_TIME_DAY,
            grouping: GroupingKey::default(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            source: SourceConfig::default(),
            parse: ParseConfig::default(),
        }
    }
}

fn default_on_time_day() -> u32 {
    DEFAULT_ON_TIME_DAY
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FeeSpec {
    Whole(i64),
    Text(String),
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Where the payment sheet comes from. At most one of `sheet_id`, `url`,
/// `file` may be set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceConfig {
    /// Google Sheets document id; the CSV export URL is derived from it.
    #[serde(default)]
    pub sheet_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Lines before the header row (report banners in hand-made exports).
    #[serde(default)]
    pub skip_rows: usize,
    /// Single-character delimiter, or `"tab"`. Sniffed when absent.
    #[serde(default)]
    pub delimiter: Option<String>,
}

/// A resolved data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Url(String),
    File(PathBuf),
}

impl SourceSpec {
    pub fn describe(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// CSV export URL of a Google Sheets document.
pub fn google_sheet_csv_url(sheet_id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{}/export?format=csv", sheet_id.trim())
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParseConfig {
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            date_formats: default_date_formats(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReportConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReportConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        self.monthly_fee_minor()?;

        if !(1..=31).contains(&self.on_time_day) {
            return Err(ReconError::ConfigValidation(format!(
                "on_time_day must be between 1 and 31, got {}",
                self.on_time_day
            )));
        }

        if self.cache_ttl_secs == 0 {
            return Err(ReconError::ConfigValidation(
                "cache_ttl_secs must be at least 1".into(),
            ));
        }

        let s = &self.source;
        let set = [s.sheet_id.is_some(), s.url.is_some(), s.file.is_some()]
            .iter()
            .filter(|b| **b)
            .count();
        if set > 1 {
            return Err(ReconError::ConfigValidation(
                "source: set only one of sheet_id, url, file".into(),
            ));
        }
        if let Some(ref id) = s.sheet_id {
            if id.trim().is_empty() {
                return Err(ReconError::ConfigValidation("source.sheet_id is empty".into()));
            }
        }

        self.layout()?;

        if self.parse.date_formats.is_empty() {
            return Err(ReconError::ConfigValidation(
                "parse.date_formats must list at least one format".into(),
            ));
        }

        Ok(())
    }

    /// The configured fee in minor units, or the default.
    pub fn monthly_fee_minor(&self) -> Result<i64, ReconError> {
        match &self.monthly_fee {
            None => Ok(DEFAULT_MONTHLY_FEE_MINOR),
            Some(FeeSpec::Whole(n)) if *n >= 0 => n.checked_mul(100).ok_or_else(|| {
                ReconError::ConfigValidation(format!("monthly_fee {n} is too large"))
            }),
            Some(FeeSpec::Whole(n)) => Err(ReconError::ConfigValidation(format!(
                "monthly_fee must not be negative, got {n}"
            ))),
            Some(FeeSpec::Text(text)) => parse_amount(text).ok_or_else(|| {
                ReconError::ConfigValidation(format!("cannot parse monthly_fee '{text}'"))
            }),
        }
    }

    pub fn settings(&self) -> Result<ReportSettings, ReconError> {
        Ok(ReportSettings {
            monthly_fee_minor: self.monthly_fee_minor()?,
            on_time_day: self.on_time_day,
            grouping: self.grouping,
        })
    }

    pub fn layout(&self) -> Result<CsvLayout, ReconError> {
        let delimiter = match self.source.delimiter.as_deref() {
            None => None,
            Some(d) => Some(parse_delimiter(d)?),
        };
        Ok(CsvLayout {
            skip_rows: self.source.skip_rows,
            delimiter,
        })
    }

    /// The configured source, if any.
    pub fn source(&self) -> Option<SourceSpec> {
        let s = &self.source;
        if let Some(ref id) = s.sheet_id {
            return Some(SourceSpec::Url(google_sheet_csv_url(id)));
        }
        if let Some(ref url) = s.url {
            return Some(SourceSpec::Url(url.clone()));
        }
        s.file.clone().map(SourceSpec::File)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// `","`, `";"`, `"|"`, `"\t"` or `"tab"` → delimiter byte.
pub fn parse_delimiter(input: &str) -> Result<u8, ReconError> {
    if input.eq_ignore_ascii_case("tab") {
        return Ok(b'\t');
    }
    match input.as_bytes() {
        [b] if b.is_ascii() && !b.is_ascii_alphanumeric() => Ok(*b),
        _ => Err(ReconError::ConfigValidation(format!(
            "delimiter must be a single punctuation character or \"tab\", got {input:?}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
