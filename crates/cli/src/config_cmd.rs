// spp config validate / spp config show

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use spp_recon::money::format_minor;
use spp_recon::ReportConfig;

use crate::exit_codes;
use crate::settings::{default_config_path, load_config};
use crate::CliError;

/// The config as it takes effect, defaults filled in.
#[derive(Serialize)]
struct EffectiveConfig {
    monthly_fee: String,
    on_time_day: u32,
    grouping: String,
    cache_ttl_secs: u64,
    source: EffectiveSource,
    parse: EffectiveParse,
}

#[derive(Serialize)]
struct EffectiveSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    sheet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<PathBuf>,
    skip_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    delimiter: Option<String>,
}

#[derive(Serialize)]
struct EffectiveParse {
    date_formats: Vec<String>,
}

impl EffectiveConfig {
    fn from_config(config: &ReportConfig) -> Result<Self, CliError> {
        Ok(Self {
            monthly_fee: format_minor(config.monthly_fee_minor()?),
            on_time_day: config.on_time_day,
            grouping: config.grouping.to_string(),
            cache_ttl_secs: config.cache_ttl_secs,
            source: EffectiveSource {
                sheet_id: config.source.sheet_id.clone(),
                url: config.source.url.clone(),
                file: config.source.file.clone(),
                skip_rows: config.source.skip_rows,
                delimiter: config.source.delimiter.clone(),
            },
            parse: EffectiveParse {
                date_formats: config.parse.date_formats.clone(),
            },
        })
    }
}

/// Parse and validate the config file; a missing file is an error here.
pub(crate) fn cmd_config_validate(config_path: Option<PathBuf>) -> Result<(), CliError> {
    let path = match config_path.or_else(default_config_path) {
        Some(path) => path,
        None => {
            return Err(CliError {
                code: exit_codes::EXIT_CONFIG_NOT_FOUND,
                message: "cannot determine the config directory".to_string(),
                hint: Some("pass --config <path>".to_string()),
            })
        }
    };
    if !path.is_file() {
        return Err(CliError {
            code: exit_codes::EXIT_CONFIG_NOT_FOUND,
            message: format!("no config file at {}", path.display()),
            hint: Some("run `spp config show` for a starting point".to_string()),
        });
    }

    let loaded = load_config(Some(&path))?;
    let config = &loaded.config;
    let mut out = io::stdout().lock();
    let io_err = |e: io::Error| CliError::output(e.to_string());

    writeln!(out, "ok: {}", path.display()).map_err(io_err)?;
    writeln!(out, "  monthly fee:  {}", format_minor(config.monthly_fee_minor()?))
        .map_err(io_err)?;
    writeln!(out, "  on time day:  {}", config.on_time_day).map_err(io_err)?;
    writeln!(out, "  grouping:     {}", config.grouping).map_err(io_err)?;
    writeln!(out, "  cache ttl:    {}s", config.cache_ttl_secs).map_err(io_err)?;
    let source = config
        .source()
        .map(|s| s.describe())
        .unwrap_or_else(|| "(none; pass --url, --sheet-id or --file)".to_string());
    writeln!(out, "  source:       {}", source).map_err(io_err)?;
    Ok(())
}

/// Print the effective config as TOML.
pub(crate) fn cmd_config_show(config_path: Option<PathBuf>) -> Result<(), CliError> {
    let loaded = load_config(config_path.as_deref())?;
    let text = render_effective(&loaded.config, loaded.path.as_deref())?;
    let mut out = io::stdout().lock();
    out.write_all(text.as_bytes())
        .map_err(|e| CliError::output(e.to_string()))
}

fn render_effective(config: &ReportConfig, path: Option<&Path>) -> Result<String, CliError> {
    let effective = EffectiveConfig::from_config(config)?;
    let body = toml::to_string(&effective)
        .map_err(|e| CliError::output(format!("TOML serialization failed: {e}")))?;
    let origin = match path {
        Some(path) => format!("# from {}\n", path.display()),
        None => match default_config_path() {
            Some(default) => format!("# defaults (no file at {})\n", default.display()),
            None => "# defaults\n".to_string(),
        },
    };
    Ok(format!("{origin}{body}"))
}
