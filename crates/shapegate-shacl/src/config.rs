use serde::{Deserialize, Serialize};

/// Validation gate settings.
///
/// Logging flags are diagnostics only and never change a validation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaclConfig {
    /// Validate on commit at all.
    pub validation_enabled: bool,
    /// Fan shapes out over a worker pool. Carries a deadlock risk on stores
    /// that serialize reads behind exclusive locks.
    pub parallel_validation: bool,
    /// Memoize target selections within one validation run.
    pub cache_selection_nodes: bool,
    /// Shapes without any target apply to every subject.
    pub wildcard_undefined_targets: bool,
    /// Conform silently instead of failing when no shapes are loaded.
    pub ignore_no_shapes_loaded: bool,
    /// Include instances of subclasses for `sh:targetClass` and `sh:class`.
    pub rdfs_sub_class_reasoning: bool,
    /// Log each compiled plan.
    pub log_validation_plans: bool,
    /// Log each violation.
    pub log_violations: bool,
    /// Log every tuple a plan emits.
    pub log_execution: bool,
    /// Guard against runaway inference; never reached by monotonic rules
    /// over a finite schema.
    pub max_inference_iterations: usize,
}

impl Default for ShaclConfig {
    fn default() -> Self {
        Self {
            validation_enabled: true,
            parallel_validation: false,
            cache_selection_nodes: true,
            wildcard_undefined_targets: false,
            ignore_no_shapes_loaded: false,
            rdfs_sub_class_reasoning: true,
            log_validation_plans: false,
            log_violations: false,
            log_execution: false,
            max_inference_iterations: 64,
        }
    }
}

impl ShaclConfig {
    pub(crate) fn warn_if_parallel(&self) {
        if self.parallel_validation {
            tracing::warn!(
                "parallel validation is enabled; it may deadlock on stores that serialize reads behind exclusive locks"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_surface() {
        let config = ShaclConfig::default();
        assert!(config.validation_enabled);
        assert!(!config.parallel_validation);
        assert!(config.cache_selection_nodes);
        assert!(!config.wildcard_undefined_targets);
        assert!(!config.ignore_no_shapes_loaded);
        assert!(config.rdfs_sub_class_reasoning);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: ShaclConfig =
            serde_json::from_str(r#"{"parallel_validation": true}"#).expect("config json");
        assert!(config.parallel_validation);
        assert!(config.validation_enabled);
        assert_eq!(config.max_inference_iterations, 64);
    }
}
