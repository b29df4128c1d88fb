use serde::Deserialize;

/// Execution flags and bounds consulted by the resolver driver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
#[allow(clippy::struct_excessive_bools)]
pub struct ResolverConfig {
    pub merge_submodules: bool,
    pub resolve_derived_types_and_groupings: bool,
    pub resolve_augments: bool,
    pub resolve_deviations: bool,
    /// Stop forwarding findings after the first error-severity one.
    pub fail_fast: bool,
    /// Drop findings on statements whose tree belongs to an import-only module.
    pub suppress_findings_on_import_only_modules: bool,
    pub max_fixpoint_iterations: usize,
    pub nesting_depth_threshold: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            merge_submodules: true,
            resolve_derived_types_and_groupings: true,
            resolve_augments: true,
            resolve_deviations: true,
            fail_fast: false,
            suppress_findings_on_import_only_modules: false,
            max_fixpoint_iterations: 10,
            nesting_depth_threshold: 3,
        }
    }
}
