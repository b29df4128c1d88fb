//! Application of `deviation` statements.
//!
//! Deviations are applied in four schema-wide phases: every `deviate add`
//! first, then every `replace`, then every `delete`, and every
//! `not-supported` last. A later phase may act on what an earlier phase of a
//! different deviation produced.

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;
use yangkit_schema::{
    Schema,
    annotations::{DeviateOperation, DeviatedStatement, DeviationRecord},
    cardinality::{is_allowed_child, is_mandatory_child, may_have_multiple},
    findings::FindingKind,
    keyword::Keyword,
    statement::{StatementId, StatementKind},
};

use crate::{
    context::ResolutionContext,
    data_type::flattened_type_names,
    errors::ResolveError,
    path::{PathTrace, statements_at_module_roots, trace_schema_node},
};

/// Core kinds handled by `deviate add`, in application order.
const ADDABLE: &[Keyword] = &[
    Keyword::Config,
    Keyword::Mandatory,
    Keyword::MaxElements,
    Keyword::MinElements,
    Keyword::Type,
    Keyword::Units,
    Keyword::Default,
    Keyword::Must,
    Keyword::Unique,
];

/// Core kinds handled by `deviate replace`, in application order.
const REPLACEABLE: &[Keyword] = &[
    Keyword::Config,
    Keyword::Default,
    Keyword::Mandatory,
    Keyword::MaxElements,
    Keyword::MinElements,
    Keyword::Must,
    Keyword::Type,
    Keyword::Unique,
    Keyword::Units,
];

/// Properties every node has implicitly, so replacing them needs no prior
/// explicit statement.
const ALWAYS_PRESENT: &[Keyword] = &[
    Keyword::Config,
    Keyword::Mandatory,
    Keyword::Type,
    Keyword::MaxElements,
    Keyword::MinElements,
    Keyword::Units,
];

/// Applies every root-level deviation, phase by phase.
pub fn resolve_deviations(ctx: &mut ResolutionContext<'_>) {
    let deviations = statements_at_module_roots(ctx.schema, Keyword::Deviation);
    let already_applied: FxHashSet<StatementId> = ctx
        .schema
        .annotations
        .deviation_history
        .values()
        .flatten()
        .map(|record| record.deviate)
        .collect();

    for phase in DeviateOperation::PHASES {
        log::debug!("deviations: applying '{phase}' over {} deviation(s)", deviations.len());
        for deviation in &deviations {
            if let Err(err) = apply_deviation(ctx, *deviation, phase, &already_applied) {
                log::warn!("deviations: skipping {deviation} in '{phase}' phase: {err}");
            }
        }
    }
}

fn apply_deviation(
    ctx: &mut ResolutionContext<'_>,
    deviation: StatementId,
    phase: DeviateOperation,
    already_applied: &FxHashSet<StatementId>,
) -> Result<(), ResolveError> {
    if !ctx.schema.arena.contains(deviation) {
        return Ok(());
    }
    let deviates: Vec<StatementId> = ctx
        .schema
        .arena
        .children_of_kind(deviation, Keyword::Deviate)
        .into_iter()
        .filter(|deviate| {
            DeviateOperation::from_argument(ctx.schema.identifier(*deviate)) == Some(phase)
                && !already_applied.contains(deviate)
        })
        .collect();
    if deviates.is_empty() {
        return Ok(());
    }

    let path = ctx.schema.identifier(deviation).to_string();
    if !path.starts_with('/') {
        return Ok(());
    }

    let target = match trace_schema_node(ctx, deviation, &path) {
        PathTrace::Found(target) => target,
        PathTrace::Missing { reached, segment }
            if removed_as_not_supported(ctx.schema, reached, &segment.name) =>
        {
            log::debug!("deviation '{path}' passes through '{segment}', removed by an earlier 'not-supported'");
            return Ok(());
        }
        PathTrace::Missing { .. } | PathTrace::Unusable => {
            ctx.report(
                deviation,
                FindingKind::UnresolvablePath,
                format!("Path to schema node '{path}', part of 'deviation' statement, cannot be resolved."),
            );
            return Ok(());
        }
    };

    if ctx.schema.in_same_module(deviation, target) {
        ctx.report(
            deviation,
            FindingKind::DeviationTargetInSameModule,
            "Both 'deviation' and its target node sit in the same (sub-)module.",
        );
    }

    for deviate in deviates {
        if matches!(phase, DeviateOperation::Add | DeviateOperation::Replace)
            && !children_allowed_under(ctx, deviate, target)
        {
            ctx.schema
                .annotations
                .add_note(deviate, "'deviate' has not been applied due to findings");
            continue;
        }
        match phase {
            DeviateOperation::Add => deviate_add(ctx, deviate, target)?,
            DeviateOperation::Replace => deviate_replace(ctx, deviate, target)?,
            DeviateOperation::Delete => deviate_delete(ctx, deviate, target)?,
            DeviateOperation::NotSupported => deviate_not_supported(ctx, deviate, target)?,
        }
        ctx.schema.annotations.add_note(deviate, "'deviate' has been applied");
    }
    Ok(())
}

/// Whether `segment` was removed from `parent` by a `not-supported` deviate.
fn removed_as_not_supported(schema: &Schema, parent: StatementId, segment: &str) -> bool {
    schema
        .annotations
        .deviation_history(parent)
        .iter()
        .any(|record| {
            record.operation == DeviateOperation::NotSupported
                && matches!(
                    &record.statement,
                    DeviatedStatement::Removed { argument: Some(argument), .. } if argument == segment
                )
        })
}

fn kind_label(schema: &Schema, statement: StatementId) -> String {
    schema
        .arena
        .kind(statement)
        .map(ToString::to_string)
        .unwrap_or_default()
}

/// Every core child of the deviate must be a legal child of the target.
/// Extensions may go anywhere.
fn children_allowed_under(ctx: &mut ResolutionContext<'_>, deviate: StatementId, target: StatementId) -> bool {
    let Some(target_keyword) = ctx.schema.arena.keyword(target) else {
        return true;
    };
    let illegal: Vec<(StatementId, Keyword)> = ctx
        .schema
        .arena
        .children(deviate)
        .iter()
        .filter_map(|child| ctx.schema.arena.keyword(*child).map(|keyword| (*child, keyword)))
        .filter(|(_, keyword)| !is_allowed_child(target_keyword, *keyword))
        .collect();

    for (child, keyword) in &illegal {
        ctx.report(
            *child,
            FindingKind::IllegalChildStatement,
            format!(
                "Statement '{keyword}' not a valid child statement of deviated statement '{target_keyword}'."
            ),
        );
    }
    illegal.is_empty()
}

/// The kinds a deviate acts on: the given core kinds, then each distinct
/// extension kind in order of appearance.
fn handled_kinds(schema: &Schema, deviate: StatementId, core: &[Keyword]) -> Vec<StatementKind> {
    let mut kinds: Vec<StatementKind> = core.iter().map(|keyword| StatementKind::Yang(*keyword)).collect();
    for child in schema.arena.children(deviate) {
        if let Some(kind) = schema.arena.kind(*child)
            && kind.is_extension()
            && !kinds.contains(kind)
        {
            kinds.push(kind.clone());
        }
    }
    kinds
}

fn can_repeat(target: Option<Keyword>, kind: &StatementKind) -> bool {
    match (kind, target) {
        (StatementKind::Extension { .. }, _) => true,
        (StatementKind::Yang(keyword), Some(target)) => may_have_multiple(target, *keyword),
        (StatementKind::Yang(_), None) => false,
    }
}

fn first_operation(schema: &Schema, statement: StatementId) -> Option<DeviateOperation> {
    schema
        .annotations
        .deviation_history(statement)
        .first()
        .map(|record| record.operation)
}

fn deviate_add(
    ctx: &mut ResolutionContext<'_>,
    deviate: StatementId,
    target: StatementId,
) -> Result<(), ResolveError> {
    let target_keyword = ctx.schema.arena.keyword(target);
    let target_label = kind_label(ctx.schema, target);

    for kind in handled_kinds(ctx.schema, deviate, ADDABLE) {
        let added = ctx.schema.arena.children_matching(deviate, &kind);
        let Some(first) = added.first().copied() else {
            continue;
        };
        let existing = ctx.schema.arena.children_matching(target, &kind);
        let repeatable = can_repeat(target_keyword, &kind);

        if !existing.is_empty() && !repeatable {
            for statement in &added {
                ctx.report(
                    *statement,
                    FindingKind::InvalidDeviateOperation,
                    format!(
                        "Cannot 'deviate add' statement '{kind}' as it already exists under the deviated statement. Use a 'deviate replace' instead."
                    ),
                );
            }
            continue;
        }
        if added.len() + existing.len() > 1 && !repeatable {
            ctx.report(
                first,
                FindingKind::DeviateCardinalityViolation,
                format!(
                    "Cannot 'deviate add' this statement as at most one '{kind}' statement is allowed under '{target_label}'."
                ),
            );
            continue;
        }

        for statement in added {
            let copy = ctx.schema.clone_statement(Some(target), statement)?;
            ctx.schema.annotations.record_deviation(
                copy,
                DeviationRecord {
                    operation: DeviateOperation::Add,
                    deviate,
                    statement: DeviatedStatement::Present(copy),
                },
            );
            ctx.schema
                .annotations
                .add_note(copy, format!("statement added by 'deviate add' {deviate}"));
        }
    }
    Ok(())
}

fn deviate_replace(
    ctx: &mut ResolutionContext<'_>,
    deviate: StatementId,
    target: StatementId,
) -> Result<(), ResolveError> {
    check_narrowed_elements(ctx, deviate, target);
    check_changed_type(ctx, deviate, target);

    let target_keyword = ctx.schema.arena.keyword(target);
    let target_label = kind_label(ctx.schema, target);

    for kind in handled_kinds(ctx.schema, deviate, REPLACEABLE) {
        let replacements = ctx.schema.arena.children_matching(deviate, &kind);
        let Some(first) = replacements.first().copied() else {
            continue;
        };
        let existing = ctx.schema.arena.children_matching(target, &kind);

        let always_present = kind
            .keyword()
            .is_some_and(|keyword| ALWAYS_PRESENT.contains(&keyword));
        if existing.is_empty() && !always_present {
            ctx.report(
                first,
                FindingKind::InvalidDeviateOperation,
                format!(
                    "Cannot 'deviate replace' statement '{kind}' as it does not exist under the deviated statement."
                ),
            );
            continue;
        }
        if !kind.is_extension() && replacements.len() > 1 && !can_repeat(target_keyword, &kind) {
            ctx.report(
                first,
                FindingKind::DeviateCardinalityViolation,
                format!(
                    "Cannot 'deviate replace' this statement as at most one '{kind}' statement is allowed under '{target_label}'."
                ),
            );
            continue;
        }

        let previous: Vec<Option<DeviateOperation>> = existing
            .iter()
            .map(|statement| first_operation(ctx.schema, *statement))
            .collect();
        let replaces_replaced = previous.contains(&Some(DeviateOperation::Replace));
        let replaces_added = previous.contains(&Some(DeviateOperation::Add));
        let replaced = existing.first().map(|statement| DeviatedStatement::Removed {
            kind: kind.clone(),
            argument: ctx.schema.arena.argument(*statement).map(str::to_string),
        });

        ctx.schema.arena.remove_children(target, &existing)?;
        for statement in replacements {
            if replaces_replaced {
                ctx.report(
                    statement,
                    FindingKind::AmbiguousDeviateReplace,
                    format!(
                        "Replaces another '{kind}' statement that has replaced the original statement by a separate 'deviate replace' operation."
                    ),
                );
            } else if replaces_added {
                ctx.report(
                    statement,
                    FindingKind::DeviateReplaceOfDeviateAdded,
                    format!(
                        "Replaces another '{kind}' statement that has been previously added by a separate 'deviate add' operation."
                    ),
                );
            }

            let copy = ctx.schema.clone_statement(Some(target), statement)?;
            ctx.schema.annotations.record_deviation(
                copy,
                DeviationRecord {
                    operation: DeviateOperation::Replace,
                    deviate,
                    statement: replaced.clone().unwrap_or(DeviatedStatement::Present(copy)),
                },
            );
            ctx.schema.annotations.add_note(
                copy,
                format!("replacement for previous statement or implicit property, by 'deviate replace' {deviate}"),
            );
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MaxElements {
    Bounded(u64),
    Unbounded,
}

fn min_elements_of(schema: &Schema, parent: StatementId) -> Option<(StatementId, u64)> {
    let statement = schema.arena.first_child_of_kind(parent, Keyword::MinElements)?;
    Some((statement, schema.identifier(statement).parse().unwrap_or(0)))
}

fn max_elements_of(schema: &Schema, parent: StatementId) -> Option<(StatementId, MaxElements)> {
    let statement = schema.arena.first_child_of_kind(parent, Keyword::MaxElements)?;
    let value = match schema.identifier(statement).parse() {
        Ok(bound) => MaxElements::Bounded(bound),
        Err(_) => MaxElements::Unbounded,
    };
    Some((statement, value))
}

/// Reports replacements that tighten min/max-elements. They are still applied.
fn check_narrowed_elements(ctx: &mut ResolutionContext<'_>, deviate: StatementId, target: StatementId) {
    let old_min = min_elements_of(ctx.schema, target).map_or(0, |(_, value)| value);
    if let Some((statement, new_min)) = min_elements_of(ctx.schema, deviate)
        && new_min > old_min
    {
        ctx.report(
            statement,
            FindingKind::ConstraintNarrowed,
            format!("Replacement raises min-elements boundary from '{old_min}' to '{new_min}'."),
        );
    }

    let old_max = max_elements_of(ctx.schema, target).map_or(MaxElements::Unbounded, |(_, value)| value);
    let Some((statement, MaxElements::Bounded(new_max))) = max_elements_of(ctx.schema, deviate) else {
        return;
    };
    let narrowed_from = match old_max {
        MaxElements::Unbounded => Some("unbounded".to_string()),
        MaxElements::Bounded(old_max) if new_max < old_max => Some(old_max.to_string()),
        MaxElements::Bounded(_) => None,
    };
    if let Some(old) = narrowed_from {
        ctx.report(
            statement,
            FindingKind::ConstraintNarrowed,
            format!("Replacement lowers max-elements boundary from '{old}' to '{new_max}'."),
        );
    }
}

/// Reports a replaced `type` whose set of flattened member types differs.
fn check_changed_type(ctx: &mut ResolutionContext<'_>, deviate: StatementId, target: StatementId) {
    let Some(new_type) = ctx.schema.arena.first_child_of_kind(deviate, Keyword::Type) else {
        return;
    };
    let Some(old_type) = ctx.schema.arena.first_child_of_kind(target, Keyword::Type) else {
        return;
    };
    let old: BTreeSet<String> = flattened_type_names(ctx.schema, old_type).into_iter().collect();
    let new: BTreeSet<String> = flattened_type_names(ctx.schema, new_type).into_iter().collect();
    if old != new {
        let listed = |names: &BTreeSet<String>| names.iter().cloned().collect::<Vec<_>>().join(", ");
        ctx.report(
            new_type,
            FindingKind::DataTypeChanged,
            format!("Data type has changed from [{}] to [{}].", listed(&old), listed(&new)),
        );
    }
}

fn deviate_delete(
    ctx: &mut ResolutionContext<'_>,
    deviate: StatementId,
    target: StatementId,
) -> Result<(), ResolveError> {
    let target_keyword = ctx.schema.arena.keyword(target);
    let target_label = kind_label(ctx.schema, target);

    for statement in ctx.schema.arena.children(deviate).to_vec() {
        let Some(kind) = ctx.schema.arena.kind(statement).cloned() else {
            continue;
        };
        let argument = ctx.schema.arena.argument(statement).map(str::to_string);
        let existing = ctx.schema.arena.children_matching(target, &kind);
        let Some(matched) = existing
            .iter()
            .copied()
            .find(|candidate| ctx.schema.arena.argument(*candidate) == argument.as_deref())
        else {
            ctx.report(
                statement,
                FindingKind::InvalidDeviateOperation,
                "Cannot 'deviate delete' this statement as the statement does not exist under the deviated statement.",
            );
            continue;
        };

        if existing.len() == 1
            && let (StatementKind::Yang(keyword), Some(target_keyword)) = (&kind, target_keyword)
            && is_mandatory_child(target_keyword, *keyword)
        {
            ctx.report(
                statement,
                FindingKind::DeviateCardinalityViolation,
                format!(
                    "Cannot 'deviate delete' this statement as at least a single '{kind}' statement is required under deviated statement '{target_label}'."
                ),
            );
            continue;
        }

        match first_operation(ctx.schema, matched) {
            Some(DeviateOperation::Add) => ctx.report(
                statement,
                FindingKind::DeviateDeleteOfDeviatedStatement,
                format!(
                    "Deletes a '{kind}' statement that was previously added by a separate 'deviate add' operation."
                ),
            ),
            Some(DeviateOperation::Replace) => ctx.report(
                statement,
                FindingKind::DeviateDeleteOfDeviatedStatement,
                format!(
                    "Deletes a '{kind}' statement that was previously replaced by a separate 'deviate replace' operation."
                ),
            ),
            _ => {}
        }

        ctx.schema.annotations.record_deviation(
            target,
            DeviationRecord {
                operation: DeviateOperation::Delete,
                deviate,
                statement: DeviatedStatement::Removed {
                    kind: kind.clone(),
                    argument,
                },
            },
        );
        ctx.schema
            .annotations
            .add_note(target, format!("'{kind}' deleted by 'deviate delete' {deviate}"));
        ctx.schema.arena.remove(matched)?;
    }
    Ok(())
}

fn deviate_not_supported(
    ctx: &mut ResolutionContext<'_>,
    deviate: StatementId,
    target: StatementId,
) -> Result<(), ResolveError> {
    let Some(parent) = ctx.schema.arena.parent(target) else {
        return Ok(());
    };
    let Some(kind) = ctx.schema.arena.kind(target).cloned() else {
        return Ok(());
    };
    let identifier = ctx.schema.identifier(target).to_string();

    ctx.schema.annotations.record_deviation(
        parent,
        DeviationRecord {
            operation: DeviateOperation::NotSupported,
            deviate,
            statement: DeviatedStatement::Removed {
                kind: kind.clone(),
                argument: Some(identifier.clone()),
            },
        },
    );
    ctx.schema.annotations.add_note(
        parent,
        format!("'{kind} {identifier}' marked as 'not-supported' by {deviate} and removed"),
    );
    ctx.schema.arena.remove(target)?;
    log::trace!("removed not-supported '{kind} {identifier}' from {parent}");
    Ok(())
}
