// src/runner.rs
use std::path::PathBuf;

use tracing::info;

use crate::{
    cache::Cache,
    catalog::Catalog,
    config::{options::RunOptions, profile::Profile},
    core::net::{HttpClient, RemoteClient},
    error::Result,
    file::write_report,
    progress::Progress,
    records::SchoolData,
    reports::{report_for, ReportContext},
};

/// Summary of what was produced.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub files_written: Vec<PathBuf>,
    /// Rows dropped by reports (missing join targets, students without a grade, ...).
    pub rows_skipped: usize,
}

/// Top-level runner: open the cache as configured, then generate and write
/// every selected report. `progress` can be None (no UI updates).
pub fn run(options: &RunOptions, mut progress: Option<&mut (dyn Progress + '_)>) -> Result<RunSummary> {
    let profile = match &options.profile {
        Some(path) => Profile::load(path)?,
        None => Profile::default(),
    };
    let catalog = match &options.catalog {
        Some(path) => Catalog::load(path)?,
        None => Catalog::school_default()?,
    };

    let client: Option<Box<dyn RemoteClient>> = match options.source.token {
        Some(_) => Some(Box::new(HttpClient::new(&options.source)?)),
        None => None,
    };

    if let Some(p) = progress.as_deref_mut() {
        p.log("Loading entity cache");
    }
    let mut cache = Cache::open(
        catalog,
        &options.source.school_id,
        client,
        &options.cache,
        progress.as_deref_mut(),
    )?;

    generate_reports(&mut cache, &profile, options, progress)
}

/// Generate and write the selected reports from an already-open cache.
pub fn generate_reports(
    cache: &mut Cache,
    profile: &Profile,
    options: &RunOptions,
    mut progress: Option<&mut (dyn Progress + '_)>,
) -> Result<RunSummary> {
    let data = SchoolData::load(cache)?;
    let ctx = ReportContext::new(&data, profile, cache.scope_id(), options.joins);

    if let Some(p) = progress.as_deref_mut() {
        p.begin(options.reports.len());
    }

    let mut summary = RunSummary::default();
    for kind in &options.reports {
        let report = report_for(*kind);
        let tables = report.generate(&ctx)?;
        let written = write_report(&options.export, report.name(), &tables)?;
        info!(report = report.name(), files = written.len(), "report written");

        if let Some(p) = progress.as_deref_mut() {
            p.item_done(report.name(), written.len());
        }
        summary.files_written.extend(written);
    }
    summary.rows_skipped = ctx.skipped();

    if let Some(p) = progress.as_deref_mut() {
        p.finish();
    }
    Ok(summary)
}
