//! Emit: build both checker artifacts and write them to disk.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::conf::TraceConfig;
use crate::state::{Cluster, SystemState};
use super::config::TlcConfig;
use super::spec::render_trace_module;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot derive a module name from spec path {0}")]
    BadSpecPath(PathBuf),

    #[error("trace module name {0:?} clashes with the protocol spec module")]
    ModuleClash(String),
}

/// Trace module and configuration, ready to be written.
#[derive(Debug, Clone)]
pub struct TraceArtifacts {
    pub module_name: String,
    pub spec: String,
    pub config: String,
}

/// Where [`TraceArtifacts::write_to`] put the files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub spec: PathBuf,
    pub config: PathBuf,
}

/// Module name of a TLA+ spec file: its file stem.
pub fn spec_module_name(spec_path: &Path) -> Result<String, EmitError> {
    spec_path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| EmitError::BadSpecPath(spec_path.to_path_buf()))
}

impl TraceArtifacts {
    /// Pure serialization of `history`; no validation happens here.
    pub fn build(
        history: &[SystemState],
        cluster: &Cluster,
        spec_module: &str,
        config: &TraceConfig,
    ) -> Result<Self, EmitError> {
        if spec_module == config.module_name {
            return Err(EmitError::ModuleClash(config.module_name.clone()));
        }
        Ok(Self {
            module_name: config.module_name.clone(),
            spec: render_trace_module(history, cluster, spec_module, config),
            config: TlcConfig::for_trace(cluster.len(), config).to_cfg_string(),
        })
    }

    /// Write `<module>.tla` and `<module>.cfg` into `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path) -> Result<ArtifactPaths, EmitError> {
        std::fs::create_dir_all(dir).map_err(|source| EmitError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let paths = ArtifactPaths {
            spec: dir.join(format!("{}.tla", self.module_name)),
            config: dir.join(format!("{}.cfg", self.module_name)),
        };

        for (path, contents) in [(&paths.spec, &self.spec), (&paths.config, &self.config)] {
            std::fs::write(path, contents).map_err(|source| EmitError::Io {
                path: path.clone(),
                source,
            })?;
        }

        info!(
            "Wrote trace artifacts: {} and {}",
            paths.spec.display(),
            paths.config.display()
        );
        Ok(paths)
    }
}
