//! TLC configuration generation for the trace module.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::conf::TraceConfig;
use super::spec::{TRACE_MATCHED, TRACE_SPEC};
use super::value::TlaValue;

/// Contents of the `.cfg` file accompanying the trace module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlcConfig {
    pub module_name: String,
    /// Constant name to TLA+ value text, emitted in name order.
    pub constants: BTreeMap<String, String>,
    pub specification: String,
    pub properties: Vec<String>,
    pub check_deadlock: bool,
}

impl TlcConfig {
    /// Configuration checking [`TRACE_MATCHED`] under [`TRACE_SPEC`] for a
    /// cluster of `n_servers`.
    pub fn for_trace(n_servers: usize, config: &TraceConfig) -> Self {
        let mut constants = BTreeMap::new();
        if !config.server_count_constant.is_empty() {
            constants.insert(
                config.server_count_constant.clone(),
                TlaValue::from(n_servers).to_string(),
            );
        }
        if !config.server_set_constant.is_empty() {
            constants.insert(
                config.server_set_constant.clone(),
                TlaValue::index_set(n_servers).to_string(),
            );
        }
        for (name, value) in &config.constants {
            constants.insert(name.clone(), value.clone());
        }

        Self {
            module_name: config.module_name.clone(),
            constants,
            specification: TRACE_SPEC.to_string(),
            properties: vec![TRACE_MATCHED.to_string()],
            // the trace deliberately stops after its last step
            check_deadlock: false,
        }
    }

    /// Generate the TLC configuration file content (.cfg format).
    pub fn to_cfg_string(&self) -> String {
        let mut output = String::new();

        output.push_str("\\* TLC Configuration File\n");
        let _ = writeln!(output, "\\* Generated for: {}\n", self.module_name);

        if !self.constants.is_empty() {
            output.push_str("CONSTANTS\n");
            for (name, value) in &self.constants {
                let _ = writeln!(output, "  {} = {}", name, value);
            }
            output.push('\n');
        }

        let _ = writeln!(output, "SPECIFICATION {}\n", self.specification);

        for prop in &self.properties {
            let _ = writeln!(output, "PROPERTY {}", prop);
        }
        if !self.properties.is_empty() {
            output.push('\n');
        }

        if !self.check_deadlock {
            output.push_str("CHECK_DEADLOCK FALSE\n");
        }

        output
    }
}
