//! CW-020: Plan generation. What a run would do to each target, without
//! loading any generator module.

use super::resolver::resolve_path;
use super::types::*;
use std::path::Path;

/// True when `target` must be skipped because its destination exists.
pub fn should_skip(target: &Target, dest: &Path) -> bool {
    target.if_not_exists && dest.exists()
}

/// Compute the plan for every target (or only `filter`, when given).
pub fn plan(config: &GenConfig, base_dir: &Path, filter: Option<&str>) -> GenerationPlan {
    let mut targets = Vec::new();
    let mut to_create = 0u32;
    let mut to_overwrite = 0u32;
    let mut to_skip = 0u32;

    for (path, target) in selected(config, filter) {
        let dest = resolve_path(base_dir, path);
        let action = determine_action(target, &dest);
        match action {
            PlanAction::Create => to_create += 1,
            PlanAction::Overwrite => to_overwrite += 1,
            PlanAction::Skip => to_skip += 1,
        }
        targets.push(PlannedTarget {
            target: path.clone(),
            module: target.module.clone(),
            visitor_class: target.visitor_class.clone(),
            action,
            commands: target.run_after.len(),
        });
    }

    GenerationPlan {
        targets,
        to_create,
        to_overwrite,
        to_skip,
    }
}

/// Targets in declaration order, narrowed by an optional output-path filter.
pub fn selected<'a>(
    config: &'a GenConfig,
    filter: Option<&'a str>,
) -> impl Iterator<Item = (&'a String, &'a Target)> + 'a {
    config
        .generates
        .iter()
        .filter(move |(path, _)| filter.map_or(true, |f| f == path.as_str()))
}

fn determine_action(target: &Target, dest: &Path) -> PlanAction {
    if should_skip(target, dest) {
        PlanAction::Skip
    } else if dest.exists() {
        PlanAction::Overwrite
    } else {
        PlanAction::Create
    }
}
