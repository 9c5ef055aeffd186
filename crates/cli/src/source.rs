//! Payment sheet loading: HTTP (Google Sheets CSV export or any URL) or a
//! local file, then normalization into a [`Dataset`].
//!
//! HTTP failures are classified the same way for every URL:
//! - network errors, 429 and 5xx are retried with exponential backoff
//!   (429 honours `Retry-After`), up to [`MAX_RETRIES`] times
//! - any other 4xx fails immediately
//! - a 200 that is an HTML page (a private sheet redirecting to a login
//!   form) is treated as unavailable, not as CSV
//!
//! Every failure surfaces as [`ReconError::SourceUnavailable`]; a body
//! without recognizable columns surfaces from the normalizer as
//! [`ReconError::SourceMalformed`].

use std::path::Path;
use std::thread;
use std::time::Duration;

use spp_recon::normalize::load_dataset;
use spp_recon::{CsvLayout, Dataset, ReconError, SourceSpec};

// ── Constants ───────────────────────────────────────────────────────

pub(crate) const MAX_RETRIES: u32 = 3;
const USER_AGENT: &str = concat!("spp/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Upper bound on a server-requested `Retry-After` wait.
const MAX_RETRY_AFTER_SECS: u64 = 60;

// ── SheetClient ─────────────────────────────────────────────────────

/// Blocking HTTP client with retry, backoff, and status classification.
pub(crate) struct SheetClient {
    http: reqwest::blocking::Client,
    initial_backoff: Duration,
}

impl SheetClient {
    pub(crate) fn new() -> Result<Self, ReconError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ReconError::SourceUnavailable(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            http,
            initial_backoff: Duration::from_secs(1),
        })
    }

    /// First retry waits `backoff`, each further retry doubles it.
    #[cfg(test)]
    pub(crate) fn with_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// GET `url` and return the body as text.
    pub(crate) fn fetch_text(&self, url: &str) -> Result<String, ReconError> {
        let mut backoff = self.initial_backoff;

        for attempt in 0..=MAX_RETRIES {
            let wait = match self.http.get(url).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    if (400..500).contains(&status) && status != 429 {
                        let body = resp.text().unwrap_or_default();
                        return Err(ReconError::SourceUnavailable(format!(
                            "{} returned HTTP {}{}",
                            url,
                            status,
                            body_excerpt(&body),
                        )));
                    }

                    if status == 429 || status >= 500 {
                        if attempt == MAX_RETRIES {
                            return Err(ReconError::SourceUnavailable(format!(
                                "{} returned HTTP {} after {} attempts",
                                url,
                                status,
                                MAX_RETRIES + 1,
                            )));
                        }
                        let wait = if status == 429 {
                            retry_after(&resp).unwrap_or(backoff)
                        } else {
                            backoff
                        };
                        log::warn!(
                            "retry {}/{} in {:?} (HTTP {})",
                            attempt + 1,
                            MAX_RETRIES,
                            wait,
                            status,
                        );
                        wait
                    } else {
                        let is_html = resp
                            .headers()
                            .get(reqwest::header::CONTENT_TYPE)
                            .and_then(|v| v.to_str().ok())
                            .is_some_and(|v| v.contains("text/html"));
                        if is_html {
                            return Err(ReconError::SourceUnavailable(format!(
                                "{url} returned an HTML page instead of CSV"
                            )));
                        }

                        let text = resp.text().map_err(|e| {
                            ReconError::SourceUnavailable(format!(
                                "failed to read response body from {url}: {e}"
                            ))
                        })?;
                        log::info!("fetched {} bytes from {}", text.len(), url);
                        return Ok(text);
                    }
                }
                Err(e) => {
                    if attempt == MAX_RETRIES {
                        return Err(ReconError::SourceUnavailable(format!(
                            "{} unreachable after {} attempts: {}",
                            url,
                            MAX_RETRIES + 1,
                            e,
                        )));
                    }
                    log::warn!(
                        "retry {}/{} in {:?} ({})",
                        attempt + 1,
                        MAX_RETRIES,
                        backoff,
                        e,
                    );
                    backoff
                }
            };

            thread::sleep(wait);
            backoff *= 2;
        }

        Err(ReconError::SourceUnavailable(format!("{url}: no attempts made")))
    }
}

fn retry_after(resp: &reqwest::blocking::Response) -> Option<Duration> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS)))
}

fn body_excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let end = trimmed
        .char_indices()
        .nth(200)
        .map_or(trimmed.len(), |(i, _)| i);
    format!(": {}", &trimmed[..end])
}

// ── Loading ─────────────────────────────────────────────────────────

/// Everything needed to turn a source into a dataset.
pub(crate) struct SourceLoader {
    pub(crate) spec: SourceSpec,
    pub(crate) layout: CsvLayout,
    pub(crate) date_formats: Vec<String>,
    client: Option<SheetClient>,
}

impl SourceLoader {
    pub(crate) fn new(
        spec: SourceSpec,
        layout: CsvLayout,
        date_formats: Vec<String>,
    ) -> Result<Self, ReconError> {
        let client = match spec {
            SourceSpec::Url(_) => Some(SheetClient::new()?),
            SourceSpec::File(_) => None,
        };
        Ok(Self {
            spec,
            layout,
            date_formats,
            client,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_client(mut self, client: SheetClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Raw text of the source.
    pub(crate) fn fetch_text(&self) -> Result<String, ReconError> {
        match (&self.spec, &self.client) {
            (SourceSpec::Url(url), Some(client)) => client.fetch_text(url),
            (SourceSpec::Url(url), None) => SheetClient::new()?.fetch_text(url),
            (SourceSpec::File(path), _) => read_file(path),
        }
    }

    /// Fetch and normalize.
    pub(crate) fn load(&self) -> Result<Dataset, ReconError> {
        let text = self.fetch_text()?;
        let dataset = load_dataset(&text, &self.layout, &self.date_formats)?;
        log::info!(
            "loaded {} payment record(s), {} student(s) from {}",
            dataset.records().len(),
            dataset.identities().len(),
            self.spec.describe(),
        );
        if dataset.undated_count() > 0 {
            log::info!(
                "{} row(s) have no usable payment date and never match a period",
                dataset.undated_count()
            );
        }
        Ok(dataset)
    }
}

/// Read a local export. Invalid UTF-8 (legacy spreadsheet encodings) is
/// replaced rather than rejected.
fn read_file(path: &Path) -> Result<String, ReconError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ReconError::SourceUnavailable(format!("{}: {}", path.display(), e)))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            log::warn!("{} is not valid UTF-8; replacing invalid bytes", path.display());
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}
