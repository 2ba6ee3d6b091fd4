//! CLI: command-line arguments of `trace-checker`.

use std::path::{Path, PathBuf};
use clap::Parser;

use crate::conf::CheckerConfig;
use crate::event::ServerId;

/// Check replica logs of a consensus protocol against its TLA+ specification.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "trace-checker",
    about = "Merge replica logs into one trace and check it with TLC",
    version
)]
pub struct CliArgs {
    /// Replica log files followed by the protocol's TLA+ spec file.
    #[arg(value_name = "LOGFILES... SPECFILE", num_args = 2.., required = true)]
    pub paths: Vec<PathBuf>,

    /// Path to the configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to tla2tools.jar.
    #[arg(long, value_name = "JAR")]
    pub tla2tools_jar: Option<PathBuf>,

    /// Ordered server ids (comma separated); discovered from the logs if omitted.
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub servers: Vec<String>,

    /// Directory for the trace module and its configuration.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Literal marking relevant log lines.
    #[arg(long, value_name = "MARKER")]
    pub marker: Option<String>,

    /// Write the trace artifacts but do not run TLC.
    #[arg(long)]
    pub skip_check: bool,

    /// Write a JSON run summary to this path.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

impl CliArgs {
    /// Every path but the last.
    pub fn logfiles(&self) -> &[PathBuf] {
        match self.paths.split_last() {
            Some((_, logs)) => logs,
            None => &[],
        }
    }

    pub fn specfile(&self) -> Option<&Path> {
        self.paths.last().map(PathBuf::as_path)
    }

    /// Command-line values take precedence over file and environment.
    pub fn apply_to(&self, config: &mut CheckerConfig) {
        if let Some(jar) = &self.tla2tools_jar {
            config.tla2tools_jar = Some(jar.clone());
        }
        if !self.servers.is_empty() {
            config.servers = self.servers.iter().map(|s| s.trim().to_string()).collect();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(marker) = &self.marker {
            config.marker = marker.clone();
        }
    }
}

/// Server ids from configuration, in the order given.
pub fn configured_servers(config: &CheckerConfig) -> Vec<ServerId> {
    config.servers.iter().map(|s| ServerId::new(s.as_str())).collect()
}
