// src/config/options.rs
use std::path::PathBuf;
use std::time::Duration;

use super::consts::*;

#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub source: SourceOptions,
    pub cache: CacheOptions,
    pub export: ExportOptions,
    pub reports: Vec<ReportKind>,
    pub profile: Option<PathBuf>,
    /// Entity catalog (TOML). None uses the built-in school catalog.
    pub catalog: Option<PathBuf>,
    pub joins: JoinPolicy,
}

/* ---------------- Remote source ---------------- */

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceOptions {
    pub school_id: String,
    pub token: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            school_id: s!(),
            token: None,
            base_url: s!(API_BASE_URL),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

/* ---------------- Cache ---------------- */

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// Always resolve remotely, then save and verify the stored copy.
    Reload,
    /// Use the stored copy; fall back to a remote reload if it is missing or corrupt.
    #[default]
    PreferStored,
    /// Offline. Storage problems are fatal.
    StoredOnly,
}

/// Explicit policy for remote fetches made by the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Extra attempts after a retryable failure. Zero means a single call.
    pub retries: u32,
    pub retry_delay: Duration,
    /// Concurrent per-parent fetches during iterate-over resolution.
    pub workers: usize,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            workers: WORKERS,
        }
    }
}

impl FetchPolicy {
    pub fn workers(&self) -> usize {
        self.workers.clamp(1, MAX_WORKERS)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheOptions {
    pub dir: PathBuf,
    pub mode: CacheMode,
    pub fetch: FetchPolicy,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(STORE_DIR),
            mode: CacheMode::default(),
            fetch: FetchPolicy::default(),
        }
    }
}

/* ---------------- Reports ---------------- */

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ReportKind {
    Registration,
    Oneroster,
    Clever,
    Directory,
    Validation,
}

impl ReportKind {
    pub const ALL: [ReportKind; 5] = [
        ReportKind::Registration,
        ReportKind::Oneroster,
        ReportKind::Clever,
        ReportKind::Directory,
        ReportKind::Validation,
    ];

    /// Output subdirectory name.
    pub fn name(&self) -> &'static str {
        match self {
            ReportKind::Registration => "registration",
            ReportKind::Oneroster => "oneroster",
            ReportKind::Clever => "clever",
            ReportKind::Directory => "directory",
            ReportKind::Validation => "validation",
        }
    }
}

/// What a report does when a row references a key missing from the joined table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JoinPolicy {
    /// Log the key and drop the row.
    #[default]
    SkipRow,
    Abort,
}

/* ---------------- Export ---------------- */

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ExportFormat {
    #[default]
    Csv,
    Tsv,
}

impl ExportFormat {
    pub fn ext(&self) -> &'static str {
        match self { ExportFormat::Csv => "csv", ExportFormat::Tsv => "tsv" }
    }
    pub fn delim(&self) -> char {
        match self { ExportFormat::Csv => ',', ExportFormat::Tsv => '\t' }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    pub out_dir: PathBuf,
    pub format: ExportFormat,
    pub include_headers: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            format: ExportFormat::Csv,
            include_headers: true,
        }
    }
}

impl ExportOptions {
    /// `<out_dir>/<report>/<table>.<ext>`
    pub fn table_path(&self, report: &str, table: &str) -> PathBuf {
        let file = join!(table, ".", self.format.ext());
        self.out_dir.join(report).join(file)
    }
}
