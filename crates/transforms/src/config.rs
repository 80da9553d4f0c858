//! Pass selection switches.

use serde::{Deserialize, Serialize};

/// Which passes a run enables, plus the knobs individual passes honor.
///
/// Every field has a serde default so a config file only needs to spell the
/// switches it flips.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub unused_variable_removal: bool,
    pub constant_propagation: bool,
    pub reassignment_removal: bool,
    pub dead_branch_removal: bool,
    pub object_packing: bool,
    pub proxy_function_inlining: bool,
    pub expression_simplification: bool,
    pub sequence_splitting: bool,
    pub control_flow_recovery: bool,
    pub property_simplification: bool,
    pub object_simplification: bool,
    /// Replace members of objects that are also written to. Obfuscated code
    /// never mutates its proxy objects, so this is on by default.
    pub unsafe_object_replace: bool,
    pub string_revealing: bool,
    /// Strip self-defence, debugger-loop, and console-silencing scaffolding.
    /// Off by default: the detection is structural and a false positive
    /// deletes live code.
    pub anti_tamper_removal: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            unused_variable_removal: true,
            constant_propagation: true,
            reassignment_removal: true,
            dead_branch_removal: true,
            object_packing: true,
            proxy_function_inlining: true,
            expression_simplification: true,
            sequence_splitting: true,
            control_flow_recovery: true,
            property_simplification: true,
            object_simplification: true,
            unsafe_object_replace: true,
            string_revealing: true,
            anti_tamper_removal: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"anti_tamper_removal": true, "object_packing": false}"#)
                .unwrap();
        assert!(config.anti_tamper_removal);
        assert!(!config.object_packing);
        assert!(config.string_revealing);
        assert!(config.unsafe_object_replace);
    }
}
