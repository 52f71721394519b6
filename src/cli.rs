// src/cli.rs
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::consts::{
    API_BASE_URL, DEFAULT_OUT_DIR, DEFAULT_RETRIES, DEFAULT_RETRY_DELAY_MS, REQUEST_TIMEOUT_SECS, STORE_DIR,
    TOKEN_ENV, WORKERS,
};
use crate::config::options::{
    CacheMode, CacheOptions, ExportFormat, ExportOptions, FetchPolicy, JoinPolicy, ReportKind, RunOptions,
    SourceOptions,
};
use crate::error::Result;
use crate::progress::Progress;

/// Cache a school's records from the SIS API and export roster files.
#[derive(Debug, Parser)]
#[command(name = "sis_roster", version, about)]
pub struct Cli {
    /// School id (scope id for every root entity).
    #[arg(long = "school")]
    pub school_id: String,

    /// Bearer token for the API.
    #[arg(long, env = TOKEN_ENV, hide_env_values = true)]
    pub token: Option<String>,

    /// Cache directory.
    #[arg(long, default_value = STORE_DIR)]
    pub cache: PathBuf,

    /// Always fetch from the API, then save and verify the cache.
    #[arg(long, conflicts_with = "offline")]
    pub reload: bool,

    /// Never touch the network; a missing cache is an error.
    #[arg(long)]
    pub offline: bool,

    /// Output directory.
    #[arg(short, long, default_value = DEFAULT_OUT_DIR)]
    pub out: PathBuf,

    /// Report(s) to generate; repeat for several. Default: all.
    #[arg(long = "report", value_enum)]
    pub reports: Vec<ReportKind>,

    /// Institution profile (TOML).
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Entity catalog (TOML) replacing the built-in one.
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
    pub format: ExportFormat,

    /// Omit the header row.
    #[arg(long)]
    pub no_headers: bool,

    /// Concurrent child fetches.
    #[arg(long, default_value_t = WORKERS)]
    pub workers: usize,

    /// Retries for transport errors, 429 and 5xx.
    #[arg(long, default_value_t = DEFAULT_RETRIES)]
    pub retries: u32,

    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY_MS)]
    pub retry_delay_ms: u64,

    #[arg(long, default_value = API_BASE_URL)]
    pub base_url: String,

    #[arg(long, default_value_t = REQUEST_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Abort instead of skipping rows whose join target is missing.
    #[arg(long)]
    pub strict_joins: bool,

    /// More output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn to_options(&self) -> RunOptions {
        let mode = if self.reload {
            CacheMode::Reload
        } else if self.offline {
            CacheMode::StoredOnly
        } else {
            CacheMode::PreferStored
        };
        let reports = if self.reports.is_empty() { ReportKind::ALL.to_vec() } else { self.reports.clone() };

        RunOptions {
            source: SourceOptions {
                school_id: self.school_id.clone(),
                token: self.token.clone().filter(|t| !t.trim().is_empty()),
                base_url: self.base_url.clone(),
                timeout: Duration::from_secs(self.timeout_secs),
            },
            cache: CacheOptions {
                dir: self.cache.clone(),
                mode,
                fetch: FetchPolicy {
                    retries: self.retries,
                    retry_delay: Duration::from_millis(self.retry_delay_ms),
                    workers: self.workers,
                },
            },
            export: ExportOptions {
                out_dir: self.out.clone(),
                format: self.format,
                include_headers: !self.no_headers,
            },
            reports,
            profile: self.profile.clone(),
            catalog: self.catalog.clone(),
            joins: if self.strict_joins { JoinPolicy::Abort } else { JoinPolicy::SkipRow },
        }
    }
}

/// Progress lines on stderr.
struct CliProgress {
    total: usize,
    done: usize,
}

impl Progress for CliProgress {
    fn begin(&mut self, total: usize) {
        self.total = total;
        self.done = 0;
    }
    fn log(&mut self, msg: &str) {
        eprintln!("{msg}");
    }
    fn item_done(&mut self, name: &str, count: usize) {
        self.done += 1;
        eprintln!("[{}/{}] {name}: {count}", self.done, self.total);
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let options = cli.to_options();

    crate::log::init(cli.verbose, Some(&options.cache.dir.join(crate::log::DEBUG_LOG_FILE)))?;

    let mut progress = CliProgress { total: 0, done: 0 };
    let summary = crate::runner::run(&options, Some(&mut progress))?;

    for path in &summary.files_written {
        println!("{}", path.display());
    }
    if summary.rows_skipped > 0 {
        eprintln!("{} row(s) skipped; see the log for details", summary.rows_skipped);
    }
    Ok(())
}
