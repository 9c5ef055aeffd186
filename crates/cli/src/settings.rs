//! Effective settings: command-line flags over the config file over defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use clap::Args;
use spp_recon::config::{google_sheet_csv_url, parse_delimiter};
use spp_recon::money::parse_amount;
use spp_recon::{
    ClassFilter, CsvLayout, GroupingKey, Period, ReportConfig, ReportQuery, ReportSettings,
    SourceSpec,
};

use crate::exit_codes;
use crate::CliError;

/// Path of the per-user config file, e.g. `~/.config/spp-report/config.toml`.
pub(crate) fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("spp-report").join("config.toml"))
}

/// A parsed config file and where it came from (`None` = built-in defaults).
pub(crate) struct LoadedConfig {
    pub(crate) config: ReportConfig,
    pub(crate) path: Option<PathBuf>,
}

impl LoadedConfig {
    /// Directory that relative `source.file` paths are resolved against.
    fn base_dir(&self) -> Option<&Path> {
        self.path.as_deref().and_then(Path::parent)
    }

    pub(crate) fn describe(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => "built-in defaults".to_string(),
        }
    }
}

/// Load `explicit` (must exist) or the default path (may be absent).
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, CliError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.is_file() => path,
            other => {
                log::debug!("no config file at {:?}; using defaults", other);
                return Ok(LoadedConfig {
                    config: ReportConfig::default(),
                    path: None,
                });
            }
        },
    };

    let text = std::fs::read_to_string(&path).map_err(|e| CliError {
        code: exit_codes::EXIT_CONFIG_NOT_FOUND,
        message: format!("cannot read config {}: {}", path.display(), e),
        hint: None,
    })?;
    let config = ReportConfig::from_toml(&text).map_err(|e| {
        CliError::from(e).with_hint(format!("in {}", path.display()))
    })?;
    log::info!("loaded config from {}", path.display());

    Ok(LoadedConfig {
        config,
        path: Some(path),
    })
}

// ============================================================================
// Flag groups
// ============================================================================

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct SourceArgs {
    /// CSV export URL of the payment sheet
    #[arg(long, env = "SPP_SHEET_URL", value_name = "URL")]
    pub(crate) url: Option<String>,

    /// Google Sheets document id (the export URL is derived from it)
    #[arg(long, value_name = "ID", conflicts_with = "file")]
    pub(crate) sheet_id: Option<String>,

    /// Local CSV export instead of a URL
    #[arg(long, value_name = "PATH")]
    pub(crate) file: Option<PathBuf>,

    /// Lines to skip before the header row
    #[arg(long, value_name = "N")]
    pub(crate) skip_rows: Option<usize>,

    /// Field delimiter (",", ";", "|" or "tab"); sniffed when omitted
    #[arg(long, value_name = "CHAR")]
    pub(crate) delimiter: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct RuleArgs {
    /// Monthly fee in rupiah, e.g. 1000000 or "Rp1.000.000"
    #[arg(long, value_name = "AMOUNT")]
    pub(crate) fee: Option<String>,

    /// Last day of the month that still counts as on time
    #[arg(long, value_name = "DAY", value_parser = clap::value_parser!(u32).range(1..=31))]
    pub(crate) on_time_day: Option<u32>,

    /// Match payments by student name only, ignoring class
    #[arg(long)]
    pub(crate) name_only: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct QueryArgs {
    /// Month to report (1-12). Defaults to the current month
    #[arg(long, short = 'm', value_parser = clap::value_parser!(u32).range(1..=12))]
    pub(crate) month: Option<u32>,

    /// Year to report. Defaults to the current year
    #[arg(long, short = 'y')]
    pub(crate) year: Option<i32>,

    /// Class to report, or "all" / "Semua"
    #[arg(long, short = 'c', value_name = "CLASS")]
    pub(crate) class: Option<String>,
}

impl QueryArgs {
    /// Resolve the query, filling missing month/year from `today`.
    pub(crate) fn query(&self, today: NaiveDate) -> Result<ReportQuery, CliError> {
        let year = self.year.unwrap_or_else(|| today.year());
        let month = self.month.unwrap_or_else(|| today.month());
        let period = Period::new(year, month).ok_or_else(|| {
            CliError::args(format!("invalid period {year}-{month:02}"))
        })?;
        Ok(ReportQuery {
            period: Some(period),
            class: self
                .class
                .as_deref()
                .map(ClassFilter::parse)
                .unwrap_or_default(),
        })
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Source selection: `--file` or `--sheet-id` when given, else `--url` /
/// `SPP_SHEET_URL`, else the config file's `[source]`.
pub(crate) fn resolve_source(
    args: &SourceArgs,
    loaded: &LoadedConfig,
) -> Result<SourceSpec, CliError> {
    if let Some(ref file) = args.file {
        return Ok(SourceSpec::File(file.clone()));
    }
    if let Some(ref id) = args.sheet_id {
        if id.trim().is_empty() {
            return Err(CliError::args("--sheet-id is empty"));
        }
        return Ok(SourceSpec::Url(google_sheet_csv_url(id)));
    }
    if let Some(ref url) = args.url {
        if !url.trim().is_empty() {
            return Ok(SourceSpec::Url(url.trim().to_string()));
        }
    }

    match loaded.config.source() {
        Some(SourceSpec::File(path)) if path.is_relative() => {
            let base = loaded.base_dir().unwrap_or_else(|| Path::new("."));
            Ok(SourceSpec::File(base.join(path)))
        }
        Some(spec) => Ok(spec),
        None => Err(CliError {
            code: exit_codes::EXIT_SOURCE_NOT_CONFIGURED,
            message: "no payment sheet configured".to_string(),
            hint: Some(
                "pass --url, --sheet-id or --file, set SPP_SHEET_URL, or add [source] to the config file"
                    .to_string(),
            ),
        }),
    }
}

pub(crate) fn resolve_layout(
    args: &SourceArgs,
    config: &ReportConfig,
) -> Result<CsvLayout, CliError> {
    let mut layout = config.layout()?;
    if let Some(rows) = args.skip_rows {
        layout.skip_rows = rows;
    }
    if let Some(ref d) = args.delimiter {
        layout.delimiter = Some(
            parse_delimiter(d).map_err(|e| CliError::args(format!("--delimiter: {e}")))?,
        );
    }
    Ok(layout)
}

pub(crate) fn resolve_settings(
    args: &RuleArgs,
    config: &ReportConfig,
) -> Result<ReportSettings, CliError> {
    let mut settings = config.settings()?;
    if let Some(ref fee) = args.fee {
        settings.monthly_fee_minor = parse_amount(fee)
            .ok_or_else(|| CliError::args(format!("cannot parse --fee {fee:?}")))?;
    }
    if let Some(day) = args.on_time_day {
        settings.on_time_day = day;
    }
    if args.name_only {
        settings.grouping = GroupingKey::NameOnly;
    }
    Ok(settings)
}

pub(crate) fn resolve_cache_ttl(flag: Option<u64>, config: &ReportConfig) -> Duration {
    flag.map(Duration::from_secs).unwrap_or_else(|| config.cache_ttl())
}
