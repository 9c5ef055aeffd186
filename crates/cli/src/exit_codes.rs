//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `spp` exit codes.
//! Exit codes are part of the shell contract: cron jobs and scripts that
//! mail the monthly report rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                               |
//! |---------|-----------|-------------------------------------------|
//! | 0       | Universal | Success                                   |
//! | 1       | Universal | Reserved (never emitted)                  |
//! | 2       | Universal | CLI usage error (bad args, bad flag value) |
//! | 10-19   | source    | Payment sheet could not be loaded         |
//! | 20-29   | config    | Config file missing, unparsable, invalid  |
//! | 30-39   | output    | Writing the report failed                 |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `CliError` or the relevant command

use spp_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - report produced.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, conflicting flags.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Source (10-19)
// =============================================================================

/// Payment data could not be obtained (network failure, HTTP error after
/// retries, unreadable file).
pub const EXIT_SOURCE_UNAVAILABLE: u8 = 10;

/// Payment data was obtained but has no recognizable column structure.
pub const EXIT_SOURCE_MALFORMED: u8 = 11;

/// No source configured: none of --url, --sheet-id, --file, SPP_SHEET_URL
/// or `[source]` in the config file.
pub const EXIT_SOURCE_NOT_CONFIGURED: u8 = 12;

// =============================================================================
// Config (20-29)
// =============================================================================

/// Config file is not valid TOML or has unknown values.
pub const EXIT_CONFIG_PARSE: u8 = 20;

/// Config file parsed but failed validation (negative fee, bad cutoff day,
/// several sources).
pub const EXIT_CONFIG_INVALID: u8 = 21;

/// `--config` names a file that does not exist or cannot be read.
pub const EXIT_CONFIG_NOT_FOUND: u8 = 22;

// =============================================================================
// Output (30-39)
// =============================================================================

/// Writing the report (stdout or --output file) failed.
pub const EXIT_OUTPUT_WRITE: u8 = 30;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::SourceUnavailable(_) => EXIT_SOURCE_UNAVAILABLE,
        ReconError::SourceMalformed(_) => EXIT_SOURCE_MALFORMED,
        ReconError::ConfigParse(_) => EXIT_CONFIG_PARSE,
        ReconError::ConfigValidation(_) => EXIT_CONFIG_INVALID,
    }
}
