//! Compiler configuration
//!
//! Options are fixed for the whole module: the capability profile in
//! particular is read once and never re-evaluated per instruction.

use crate::error::{CompileError, CompileResult};
use serde::Deserialize;

/// Default import module of the host helper functions
pub const DEFAULT_HOST_MODULE: &str = "NonGC";

/// Default class holding the string table accessor
pub const DEFAULT_STRING_TABLE_CLASS: &str = "jwasm/runtime/StringTable";

/// Per-module compiler options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerOptions {
    /// Target supports native struct and array types (profile A)
    pub use_gc: bool,
    /// Keep readable function names in the text writer output
    pub debug_names: bool,
    /// Import module of the host helper functions (profile B)
    pub host_module: String,
    /// Class that implements the string constant accessor
    pub string_table_class: String,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            use_gc: false,
            debug_names: false,
            host_module: DEFAULT_HOST_MODULE.to_string(),
            string_table_class: DEFAULT_STRING_TABLE_CLASS.to_string(),
        }
    }
}

impl CompilerOptions {
    /// Options for the given capability profile, everything else default
    pub fn with_gc(use_gc: bool) -> Self {
        Self {
            use_gc,
            ..Self::default()
        }
    }

    /// Parse options from a TOML document
    pub fn from_toml_str(source: &str) -> CompileResult<Self> {
        toml::from_str(source).map_err(|e| CompileError::Config {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CompilerOptions::default();
        assert!(!options.use_gc);
        assert_eq!(options.host_module, "NonGC");
    }

    #[test]
    fn test_from_toml() {
        let options = CompilerOptions::from_toml_str(
            r#"
            use_gc = true
            debug_names = true
            host_module = "Host"
            "#,
        )
        .unwrap();
        assert!(options.use_gc);
        assert!(options.debug_names);
        assert_eq!(options.host_module, "Host");
        assert_eq!(options.string_table_class, DEFAULT_STRING_TABLE_CLASS);
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        let err = CompilerOptions::from_toml_str("gc = true").unwrap_err();
        assert!(matches!(err, CompileError::Config { .. }));
    }

    #[test]
    fn test_from_toml_empty() {
        assert_eq!(
            CompilerOptions::from_toml_str("").unwrap(),
            CompilerOptions::default()
        );
    }
}
