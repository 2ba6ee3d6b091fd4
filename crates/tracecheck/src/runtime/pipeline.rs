//! Pipeline: one batch run from replica logs to the checker's verdict.
//!
//! Sources are read, parsed and normalized on independent blocking workers.
//! Their outputs are collected before anything else happens; from the merge
//! onwards the run is strictly sequential.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::conf::{CheckerConfig, ConfigError};
use crate::event::{normalize_source, EventError, LogEvent};
use crate::merge::{ensure_sorted, merge};
use crate::parser::{parse_source, MarkerLineParser, ParseMetrics, SkipReason, SourceId};
use crate::state::{reconstruct, Cluster, ClusterError, ReconstructError, SystemState};
use crate::trace::{
    resolve_jar, spec_module_name, ArtifactPaths, CheckerError, CheckerVerdict, EmitError,
    TlcRunner, TraceArtifacts,
};
use super::cli::configured_servers;
use super::context::{RunContext, SourceReport};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FATAL: u8 = 1;
pub const EXIT_VIOLATIONS: u8 = 2;
pub const EXIT_CHECKER: u8 = 3;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no events recovered from {sources} source(s)")]
    NoEvents { sources: usize },

    #[error("invalid server registry: {0}")]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Reconstruct(#[from] ReconstructError),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error("source worker failed: {0}")]
    Worker(#[from] JoinError),
}

/// What to run on, as given on the command line.
#[derive(Debug, Clone)]
pub struct RunInputs {
    /// Replica logs; their order breaks timestamp ties in the merge
    pub logfiles: Vec<PathBuf>,
    pub specfile: PathBuf,
    pub skip_check: bool,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub context: RunContext,
    pub cluster: Cluster,
    pub history: Vec<SystemState>,
    pub artifacts: ArtifactPaths,
    /// `None` when the checker was skipped
    pub checker: Option<Result<CheckerVerdict, CheckerError>>,
}

impl RunOutcome {
    /// Violations win over a checker failure; both are reported.
    pub fn exit_code(&self) -> u8 {
        if !self.context.is_consistent() {
            EXIT_VIOLATIONS
        } else if matches!(self.checker, Some(Err(_))) {
            EXIT_CHECKER
        } else {
            EXIT_SUCCESS
        }
    }
}

/// Read, parse and normalize one source. Runs on a blocking worker.
pub fn process_source(
    parser: &MarkerLineParser,
    path: &Path,
    rank: usize,
) -> Result<SourceReport, RunError> {
    let data = std::fs::read(path).map_err(|source| RunError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let source = SourceId::new(rank, path.display().to_string());
    Ok(process_data(parser, &data, source))
}

/// Parse and normalize the already-read contents of one source.
pub fn process_data(parser: &MarkerLineParser, data: &[u8], source: SourceId) -> SourceReport {
    let mut report = SourceReport::new(source.clone());
    let mut metrics = ParseMetrics::new();

    let parsed = parse_source(parser, data, &source, &mut metrics);
    for e in &parsed.errors {
        report.skip(e.line_no(), SkipReason::MalformedLine, e.to_string());
    }

    let normalized = normalize_source(&parsed.lines, &mut metrics);
    for (line_no, e) in &normalized.errors {
        let reason = match e {
            EventError::MissingField(_) => SkipReason::MissingField,
            EventError::Format { .. } => SkipReason::Format,
        };
        report.skip(*line_no, reason, e.to_string());
    }

    let mut events = normalized.events;
    let regressions = ensure_sorted(&mut events);
    metrics.record_out_of_order(regressions);

    info!(
        source = %source,
        "Parsed {} event(s) from {} relevant line(s), {} skipped",
        events.len(),
        metrics.lines_matched,
        metrics.skipped_total()
    );

    report.events = events;
    report.metrics = metrics;
    report
}

/// Parse every source in parallel and wait for all of them.
///
/// Reports come back in caller order regardless of which worker finished first.
pub async fn collect_sources(
    parser: &MarkerLineParser,
    logfiles: &[PathBuf],
) -> Result<Vec<SourceReport>, RunError> {
    let mut workers = JoinSet::new();
    for (rank, path) in logfiles.iter().enumerate() {
        let parser = parser.clone();
        let path = path.clone();
        workers.spawn_blocking(move || process_source(&parser, &path, rank));
    }

    let mut reports = Vec::with_capacity(logfiles.len());
    while let Some(joined) = workers.join_next().await {
        reports.push(joined??);
    }
    reports.sort_by_key(SourceReport::rank);
    Ok(reports)
}

/// Registry from configuration, or every server the stream mentions.
fn resolve_cluster(config: &CheckerConfig, events: &[LogEvent]) -> Result<Cluster, ClusterError> {
    if config.servers.is_empty() {
        let cluster = Cluster::discover(events)?;
        info!(
            "Discovered {} server(s): {}",
            cluster.len(),
            cluster.ids().iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", ")
        );
        Ok(cluster)
    } else {
        Cluster::new(configured_servers(config))
    }
}

/// Checker run; failures are returned for reporting rather than aborting.
async fn run_checker(
    config: &CheckerConfig,
    specfile: &Path,
    artifacts: &ArtifactPaths,
) -> Result<CheckerVerdict, CheckerError> {
    let jar = resolve_jar(config.tla2tools_jar.as_deref())?;

    let spec_dir = specfile
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let library = std::path::absolute(spec_dir).unwrap_or_else(|_| spec_dir.to_path_buf());

    let runner = TlcRunner::new(jar)
        .with_java(&config.java)
        .with_workers(config.workers)
        .with_timeout(config.checker_timeout_secs.map(Duration::from_secs))
        .with_library(library);

    info!("Running TLC on {}", artifacts.spec.display());
    runner.check(artifacts).await
}

/// Run the whole pipeline once.
pub async fn run(config: &CheckerConfig, inputs: &RunInputs) -> Result<RunOutcome, RunError> {
    if !inputs.specfile.is_file() {
        return Err(RunError::Io {
            path: inputs.specfile.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "spec file not found"),
        });
    }
    let spec_module = spec_module_name(&inputs.specfile)?;

    let parser = MarkerLineParser::new(config.marker.clone());
    let mut ctx = RunContext::new();

    // Barrier: every source is parsed before the merge starts
    let reports = collect_sources(&parser, &inputs.logfiles).await?;
    let per_source: Vec<Vec<LogEvent>> = reports.into_iter().map(|r| ctx.absorb(r)).collect();

    let merged = merge(per_source);
    debug!("Merged {} event(s) from {} source(s)", merged.len(), ctx.sources.len());
    if merged.is_empty() {
        return Err(RunError::NoEvents {
            sources: ctx.sources.len(),
        });
    }

    let cluster = resolve_cluster(config, &merged)?;
    let mut events = Vec::with_capacity(merged.len());
    for event in merged {
        if cluster.index_of(&event.server_id).is_some() {
            events.push(event);
        } else {
            warn!(
                "Skipping event at {}: server {} is not in the cluster",
                event.location(),
                event.server_id
            );
            ctx.skip_unknown_server(&event);
        }
    }
    if events.is_empty() {
        return Err(RunError::NoEvents {
            sources: ctx.sources.len(),
        });
    }
    ctx.merged_events = events.len();

    let reconstruction = reconstruct(&events, &cluster)?;
    ctx.snapshots = reconstruction.snapshots.len();
    ctx.violations = reconstruction.violations;
    if !ctx.is_consistent() {
        warn!(
            "Trace is not protocol-consistent: {} violation(s)",
            ctx.violations.len()
        );
    }

    let artifacts = TraceArtifacts::build(
        &reconstruction.snapshots,
        &cluster,
        &spec_module,
        &config.trace,
    )?
    .write_to(&config.output_dir)?;

    let checker = if inputs.skip_check {
        info!("Skipping TLC run");
        None
    } else {
        Some(run_checker(config, &inputs.specfile, &artifacts).await)
    };

    Ok(RunOutcome {
        context: ctx,
        cluster,
        history: reconstruction.snapshots,
        artifacts,
        checker,
    })
}
