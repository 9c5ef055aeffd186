// spp - monthly SPP (tuition) payment reports from a Google Sheets export

mod config_cmd;
mod exit_codes;
mod export;
mod render;
mod report;
mod settings;
mod source;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use spp_recon::ReconError;

use exit_codes::{recon_exit_code, EXIT_OUTPUT_WRITE, EXIT_SUCCESS, EXIT_USAGE};
use report::OutputFormat;
use settings::{QueryArgs, RuleArgs, SourceArgs};

#[derive(Parser)]
#[command(name = "spp")]
#[command(about = "Monthly SPP payment reports: who paid on time, who still owes")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Config file (default: <config dir>/spp-report/config.toml)
    #[arg(long, global = true, env = "SPP_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug). RUST_LOG also works
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile one month: status, total paid and shortfall per student
    #[command(after_help = "\
A student is Lunas (paid) when at least one payment in the month falls on or \
before the on-time day (default 10). Totals count every payment in the month.

Examples:
  spp report --sheet-id 1AbC... --month 3 --year 2024
  spp report --file export.csv --class 7A
  spp report --month 3 --format csv --output rekap-maret.csv
  spp report --format json | jq '.rows[] | select(.status == \"unpaid\")'
  SPP_SHEET_URL=https://... spp report --fee Rp1.250.000")]
    Report {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        rules: RuleArgs,

        #[command(flatten)]
        query: QueryArgs,

        /// Output format
        #[arg(long, short = 'f', value_enum, default_value = "table")]
        format: OutputFormat,

        /// Output file (omit or - for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Suppress the summary line on stderr
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// List the months and classes present in the sheet
    #[command(after_help = "\
Examples:
  spp periods --file export.csv
  spp periods --json")]
    Periods {
        #[command(flatten)]
        source: SourceArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-render the report on an interval, refetching when the cache expires
    #[command(after_help = "\
The sheet is fetched at most once per cache TTL (cache_ttl_secs, default 600). \
Without --month/--year the report follows the current month.

Examples:
  spp watch --sheet-id 1AbC... --class 7A
  spp watch --interval 30 --cache-ttl 120")]
    Watch {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        rules: RuleArgs,

        #[command(flatten)]
        query: QueryArgs,

        /// Seconds between renders
        #[arg(long, default_value_t = 60)]
        interval: u64,

        /// Seconds a fetched sheet stays fresh (overrides cache_ttl_secs)
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        cache_ttl: Option<u64>,

        /// Stop after this many renders
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
        iterations: Option<u64>,
    },

    /// Inspect the config file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Parse and validate the config file
    Validate,
    /// Print the effective config (defaults filled in) as TOML
    Show,
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn init_logging(verbose: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(log::LevelFilter::Info);
        }
        _ => {
            builder.filter_level(log::LevelFilter::Debug);
        }
    }
    builder.format_timestamp(None).format_target(false).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.config;
    let result = match cli.command {
        None => {
            // No subcommand = show usage
            eprintln!("Usage: spp <command> [options]");
            eprintln!("       spp --help for more information");
            Ok(())
        }
        Some(Commands::Report {
            source,
            rules,
            query,
            format,
            output,
            quiet,
        }) => report::cmd_report(config, source, rules, query, format, output, quiet),
        Some(Commands::Periods { source, json }) => report::cmd_periods(config, source, json),
        Some(Commands::Watch {
            source,
            rules,
            query,
            interval,
            cache_ttl,
            iterations,
        }) => report::cmd_watch(config, source, rules, query, interval, cache_ttl, iterations),
        Some(Commands::Config(cmd)) => match cmd {
            ConfigCommands::Validate => config_cmd::cmd_config_validate(config),
            ConfigCommands::Show => config_cmd::cmd_config_show(config),
        },
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            err.eprint();
            ExitCode::from(err.code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn output(msg: impl Into<String>) -> Self {
        Self { code: EXIT_OUTPUT_WRITE, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Print `error:` and `hint:` lines to stderr.
    pub fn eprint(&self) {
        if !self.message.is_empty() {
            eprintln!("error: {}", self.message);
        }
        if let Some(ref hint) = self.hint {
            eprintln!("hint:  {}", hint);
        }
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::SourceUnavailable(_) => Some(
                "check the URL or path; a Google Sheet must be shared as \"anyone with the link\"",
            ),
            ReconError::SourceMalformed(_) => Some(
                "expected columns Nama Siswa, Kelas, Tanggal Bayar, Jumlah Bayar; \
                 use --skip-rows for banner lines above the header",
            ),
            ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => None,
        };
        Self {
            code: recon_exit_code(&err),
            message: err.to_string(),
            hint: hint.map(str::to_string),
        }
    }
}
