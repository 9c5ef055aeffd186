// spp report / spp periods / spp watch

use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use chrono::{Local, Utc};
use clap::ValueEnum;
use serde::Serialize;
use spp_recon::filter::{available_classes, available_periods};
use spp_recon::{run, DatasetCache, Report, ReportSettings};

use crate::export::write_csv;
use crate::render::{summary_line, write_selectors, write_table};
use crate::settings::{
    load_config, resolve_cache_ttl, resolve_layout, resolve_settings, resolve_source, QueryArgs,
    RuleArgs, SourceArgs,
};
use crate::source::SourceLoader;
use crate::CliError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Aligned table with title and summary
    Table,
    /// CSV export, one row per student
    Csv,
    /// Full report as JSON (amounts in minor units)
    Json,
}

/// Loader plus reconciliation settings, resolved from flags and config.
struct Prepared {
    loader: SourceLoader,
    settings: ReportSettings,
    cache_ttl: Duration,
}

fn prepare(
    config_path: Option<&Path>,
    source: &SourceArgs,
    rules: &RuleArgs,
    cache_ttl: Option<u64>,
) -> Result<Prepared, CliError> {
    let loaded = load_config(config_path)?;
    let spec = resolve_source(source, &loaded)?;
    let layout = resolve_layout(source, &loaded.config)?;
    let settings = resolve_settings(rules, &loaded.config)?;
    log::debug!(
        "source {} (config: {}), fee {} minor, on time through day {}, grouping {}",
        spec.describe(),
        loaded.describe(),
        settings.monthly_fee_minor,
        settings.on_time_day,
        settings.grouping,
    );

    let loader = SourceLoader::new(spec, layout, loaded.config.parse.date_formats.clone())?;
    Ok(Prepared {
        loader,
        settings,
        cache_ttl: resolve_cache_ttl(cache_ttl, &loaded.config),
    })
}

fn open_output(output: Option<&Path>) -> Result<Box<dyn Write>, CliError> {
    match output {
        Some(path) if path != Path::new("-") => {
            let file = File::create(path)
                .map_err(|e| CliError::output(format!("{}: {}", path.display(), e)))?;
            Ok(Box::new(io::BufWriter::new(file)))
        }
        _ => Ok(Box::new(io::stdout().lock())),
    }
}

fn write_report<W: Write>(
    out: &mut W,
    report: &Report,
    format: OutputFormat,
) -> Result<(), CliError> {
    let io_err = |e: io::Error| CliError::output(e.to_string());
    match format {
        OutputFormat::Table => write_table(out, report).map_err(io_err)?,
        OutputFormat::Csv => {
            write_csv(&mut *out, report).map_err(|e| CliError::output(e.to_string()))?
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(report)
                .map_err(|e| CliError::output(format!("JSON serialization failed: {e}")))?;
            writeln!(out, "{json}").map_err(io_err)?;
        }
    }
    out.flush().map_err(io_err)
}

// ============================================================================
// spp report
// ============================================================================

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_report(
    config_path: Option<PathBuf>,
    source: SourceArgs,
    rules: RuleArgs,
    query: QueryArgs,
    format: OutputFormat,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let prepared = prepare(config_path.as_deref(), &source, &rules, None)?;
    let query = query.query(Local::now().date_naive())?;

    let dataset = prepared.loader.load()?;
    let report = run(&dataset, &query, &prepared.settings);

    let mut out = open_output(output.as_deref())?;
    write_report(&mut out, &report, format)?;
    drop(out);

    let to_file = output.as_deref().is_some_and(|p| p != Path::new("-"));
    if !quiet && (to_file || format != OutputFormat::Table) {
        if let Some(path) = output.as_deref().filter(|_| to_file) {
            eprintln!("wrote {}", path.display());
        }
        eprintln!("{}", summary_line(&report));
    }
    Ok(())
}

// ============================================================================
// spp periods
// ============================================================================

#[derive(Serialize)]
struct PeriodEntry {
    year: i32,
    month: u32,
    label: String,
}

#[derive(Serialize)]
struct Selectors {
    periods: Vec<PeriodEntry>,
    classes: Vec<String>,
    records: usize,
    undated: usize,
}

pub(crate) fn cmd_periods(
    config_path: Option<PathBuf>,
    source: SourceArgs,
    json: bool,
) -> Result<(), CliError> {
    let prepared = prepare(config_path.as_deref(), &source, &RuleArgs::default(), None)?;
    let dataset = prepared.loader.load()?;

    let periods = available_periods(dataset.records());
    let classes = available_classes(dataset.records());
    let mut out = io::stdout().lock();

    if json {
        let selectors = Selectors {
            periods: periods
                .iter()
                .map(|p| PeriodEntry {
                    year: p.year(),
                    month: p.month(),
                    label: p.to_string(),
                })
                .collect(),
            classes,
            records: dataset.records().len(),
            undated: dataset.undated_count(),
        };
        let text = serde_json::to_string_pretty(&selectors)
            .map_err(|e| CliError::output(format!("JSON serialization failed: {e}")))?;
        writeln!(out, "{text}").map_err(|e| CliError::output(e.to_string()))?;
    } else {
        write_selectors(&mut out, &periods, &classes)
            .map_err(|e| CliError::output(e.to_string()))?;
    }
    Ok(())
}

// ============================================================================
// spp watch
// ============================================================================

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_watch(
    config_path: Option<PathBuf>,
    source: SourceArgs,
    rules: RuleArgs,
    query: QueryArgs,
    interval: u64,
    cache_ttl: Option<u64>,
    iterations: Option<u64>,
) -> Result<(), CliError> {
    let prepared = prepare(config_path.as_deref(), &source, &rules, cache_ttl)?;
    let mut cache = DatasetCache::new(prepared.cache_ttl);
    let interval = Duration::from_secs(interval);
    log::info!(
        "watching {} every {:?} (cache ttl {:?})",
        prepared.loader.spec.describe(),
        interval,
        cache.ttl(),
    );

    let mut rendered = 0u64;
    loop {
        rendered += 1;
        let result = render_once(&mut cache, &prepared, &query);
        let last = iterations.is_some_and(|max| rendered >= max);

        match result {
            Err(err) if last => return Err(err),
            // Keep watching; the next tick retries the load.
            Err(err) => err.eprint(),
            Ok(()) => {}
        }
        if last {
            return Ok(());
        }
        thread::sleep(interval);
    }
}

fn render_once(
    cache: &mut DatasetCache,
    prepared: &Prepared,
    query: &QueryArgs,
) -> Result<(), CliError> {
    let dataset = cache.get_or_load(Utc::now(), || prepared.loader.load())?;
    // Re-resolved every tick so an unpinned month follows the calendar.
    let query = query.query(Local::now().date_naive())?;
    let report = run(&dataset, &query, &prepared.settings);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let io_err = |e: io::Error| CliError::output(e.to_string());
    if stdout.is_terminal() {
        write!(out, "\x1b[2J\x1b[H").map_err(io_err)?;
    }
    write_table(&mut out, &report).map_err(io_err)?;

    let loaded = cache
        .loaded_at()
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_default();
    let expires = cache
        .expires_at()
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_default();
    writeln!(out).map_err(io_err)?;
    writeln!(out, "Data dimuat {loaded}, dimuat ulang setelah {expires}").map_err(io_err)?;
    out.flush().map_err(io_err)
}
