//! Model: CheckerConfig and related structs.

use std::collections::BTreeMap;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};

use crate::parser::DEFAULT_MARKER;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Literal that marks relevant lines in the replica logs
    pub marker: String,
    /// Ordered server ids; empty means discover them from the logs
    pub servers: Vec<String>,
    /// Where the trace module and its configuration are written
    pub output_dir: PathBuf,
    pub tla2tools_jar: Option<PathBuf>,
    /// Java executable used to launch the checker
    pub java: PathBuf,
    pub workers: u32,
    /// Give up on the checker after this long; `None` waits indefinitely
    pub checker_timeout_secs: Option<u64>,
    pub trace: TraceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Name of the generated module (and stem of both artifacts)
    pub module_name: String,
    /// Initial-state predicate of the protocol spec conjoined into the trace init
    pub init_predicate: Option<String>,
    /// Next-state action of the protocol spec every trace step must satisfy
    pub next_action: Option<String>,
    pub variables: VariableNames,
    /// Constant receiving the server count; empty to leave it out
    pub server_count_constant: String,
    /// Constant receiving the set of server indices; empty to leave it out
    pub server_set_constant: String,
    /// Extra constants written verbatim to the checker configuration
    pub constants: BTreeMap<String, String>,
}

/// Names of the protocol spec's state variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableNames {
    pub role: String,
    pub slot: String,
    pub log: String,
    pub ballot: String,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            servers: Vec::new(),
            output_dir: PathBuf::from("."),
            tla2tools_jar: None,
            java: PathBuf::from("java"),
            workers: 1,
            checker_timeout_secs: None,
            trace: TraceConfig::default(),
        }
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            module_name: "Trace".to_string(),
            init_predicate: Some("Init".to_string()),
            next_action: Some("Next".to_string()),
            variables: VariableNames::default(),
            server_count_constant: "NServers".to_string(),
            server_set_constant: "Servers".to_string(),
            constants: BTreeMap::new(),
        }
    }
}

impl Default for VariableNames {
    fn default() -> Self {
        Self {
            role: "state".to_string(),
            slot: "slot".to_string(),
            log: "log".to_string(),
            ballot: "ballot".to_string(),
        }
    }
}

impl VariableNames {
    pub fn all(&self) -> [&str; 4] {
        [&self.role, &self.slot, &self.log, &self.ballot]
    }
}

impl TraceConfig {
    /// Validate names that end up as TLA+ identifiers
    pub fn validate(&self) -> Result<(), String> {
        if !is_identifier(&self.module_name) {
            return Err(format!("trace.module_name {:?} is not a valid identifier", self.module_name));
        }
        for name in self.variables.all() {
            if !is_identifier(name) {
                return Err(format!("trace.variables entry {:?} is not a valid identifier", name));
            }
        }
        let mut seen = self.variables.all().to_vec();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != 4 {
            return Err("trace.variables must name four distinct variables".to_string());
        }
        for name in [&self.server_count_constant, &self.server_set_constant] {
            if !name.is_empty() && !is_identifier(name) {
                return Err(format!("trace server constant {:?} is not a valid identifier", name));
            }
        }
        for name in self.constants.keys() {
            if !is_identifier(name) {
                return Err(format!("trace.constants key {:?} is not a valid identifier", name));
            }
        }
        Ok(())
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
