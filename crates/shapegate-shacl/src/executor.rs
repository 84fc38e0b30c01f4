//! Runs a validation plan against one data view.

use crate::cache::SelectionCache;
use crate::config::ShaclConfig;
use crate::error::{ShaclError, ShaclResult};
use crate::plan::{ExecutionContext, ShapePlan, ValidationPlan};
use crate::report::{ValidationReport, ViolationRecord};
use rayon::prelude::*;
use shapegate_store::{DataView, QueryEngine, StoreResult};

/// Validate `view` against every planned shape.
///
/// With `parallel` set, shapes are fanned out over the rayon pool and joined
/// before the report is built; otherwise they run in declaration order on the
/// calling thread. The report is the same either way.
pub fn validate(
    plan: &ValidationPlan,
    view: &DataView,
    queries: &dyn QueryEngine,
    config: &ShaclConfig,
    parallel: bool,
) -> ShaclResult<ValidationReport> {
    if plan.declared_shapes == 0 {
        if config.ignore_no_shapes_loaded {
            return Ok(ValidationReport::conforming());
        }
        return Err(ShaclError::NoShapesLoaded);
    }

    if config.log_validation_plans {
        for shape in &plan.shapes {
            for constraint in &shape.constraints {
                tracing::info!(
                    shape = %shape.shape.id,
                    component = %constraint.component,
                    "validation plan:\n{}",
                    constraint.root.explain()
                );
            }
        }
    }

    let cache = config.cache_selection_nodes.then(SelectionCache::new);
    let ctx = ExecutionContext {
        view,
        queries,
        cache: cache.as_ref(),
        subclass_reasoning: config.rdfs_sub_class_reasoning,
    };
    let run_shape = |shape: &ShapePlan| -> StoreResult<Vec<ViolationRecord>> {
        let mut records = Vec::new();
        for constraint in &shape.constraints {
            records.extend(constraint.violations(ctx, config.log_execution)?);
        }
        Ok(records)
    };

    let per_shape: Vec<Vec<ViolationRecord>> = if parallel {
        plan.shapes.par_iter().map(run_shape).collect::<StoreResult<_>>()?
    } else {
        plan.shapes.iter().map(run_shape).collect::<StoreResult<_>>()?
    };
    let report = ValidationReport::from_records(per_shape.into_iter().flatten());

    if config.log_violations {
        for record in report.results() {
            tracing::info!(
                shape = %record.source_shape,
                focus = %record.focus_node,
                component = %record.source_constraint_component,
                "violation: {}",
                record.message
            );
        }
    }
    tracing::debug!(
        view = %view.id(),
        shapes = plan.shapes.len(),
        constraints = plan.constraint_count(),
        changed = view.has_changes(),
        violations = report.len(),
        parallel,
        cache_hits = cache.as_ref().map_or(0, SelectionCache::hits),
        "validation finished"
    );
    Ok(report)
}
