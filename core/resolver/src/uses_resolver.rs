//! Expansion of `uses` into copies of the referenced `grouping`.
//!
//! The grouping is never modified. Its body is deep-copied into a scratch
//! grouping next to the original, the `uses`' refines, augments, `if-feature`s
//! and `when` are applied to the copy, and the copy's data nodes then take the
//! place of the `uses`.

use yangkit_schema::{
    errors::SchemaError,
    findings::FindingKind,
    keyword::Keyword,
    statement::{StatementId, Status},
};

use crate::{
    augment_resolver::AUGMENTED_KINDS,
    context::ResolutionContext,
    errors::ResolveError,
    fixpoint::{DepthReport, FixpointLoop, FixpointPass, Outcome},
    fixups::{
        children_of_kinds, clone_onto_each, inject_case_for_shorthand, push_status,
        replace_children_of_kind, status_value,
    },
    path::{find_schema_node_below, find_statement, statements_in_schema},
};

/// What a `uses` contributes to its parent, in the order it is inserted.
const EXPANDED_KINDS: &[Keyword] = &[
    Keyword::Action,
    Keyword::Anyxml,
    Keyword::Anydata,
    Keyword::Choice,
    Keyword::Container,
    Keyword::Leaf,
    Keyword::LeafList,
    Keyword::List,
    Keyword::Notification,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefineMode {
    Replace,
    Add,
}

struct RefineRule {
    keyword: Keyword,
    mode: RefineMode,
    /// `None` means any target.
    targets: Option<&'static [Keyword]>,
}

const REFINE_RULES: &[RefineRule] = &[
    RefineRule {
        keyword: Keyword::Description,
        mode: RefineMode::Replace,
        targets: None,
    },
    RefineRule {
        keyword: Keyword::Reference,
        mode: RefineMode::Replace,
        targets: None,
    },
    RefineRule {
        keyword: Keyword::Config,
        mode: RefineMode::Replace,
        targets: None,
    },
    RefineRule {
        keyword: Keyword::Default,
        mode: RefineMode::Replace,
        targets: Some(&[Keyword::Leaf, Keyword::LeafList, Keyword::Choice]),
    },
    RefineRule {
        keyword: Keyword::Mandatory,
        mode: RefineMode::Replace,
        targets: Some(&[
            Keyword::Leaf,
            Keyword::Anydata,
            Keyword::Anyxml,
            Keyword::Choice,
        ]),
    },
    RefineRule {
        keyword: Keyword::Presence,
        mode: RefineMode::Replace,
        targets: Some(&[Keyword::Container]),
    },
    RefineRule {
        keyword: Keyword::Must,
        mode: RefineMode::Add,
        targets: Some(&[
            Keyword::Leaf,
            Keyword::LeafList,
            Keyword::List,
            Keyword::Container,
            Keyword::Anydata,
            Keyword::Anyxml,
        ]),
    },
    RefineRule {
        keyword: Keyword::MinElements,
        mode: RefineMode::Replace,
        targets: Some(&[Keyword::LeafList, Keyword::List]),
    },
    RefineRule {
        keyword: Keyword::MaxElements,
        mode: RefineMode::Replace,
        targets: Some(&[Keyword::LeafList, Keyword::List]),
    },
    RefineRule {
        keyword: Keyword::IfFeature,
        mode: RefineMode::Add,
        targets: Some(&[
            Keyword::Leaf,
            Keyword::LeafList,
            Keyword::List,
            Keyword::Container,
            Keyword::Choice,
            Keyword::Case,
            Keyword::Anydata,
            Keyword::Anyxml,
        ]),
    },
];

/// Expands every resolvable `uses` in the schema, reports the ones left over,
/// then reports groupings used never or only once.
pub fn resolve_uses(ctx: &mut ResolutionContext<'_>) {
    let fixpoint = FixpointLoop {
        label: "uses",
        max_iterations: ctx.config.max_fixpoint_iterations,
        depth_threshold: ctx.config.nesting_depth_threshold,
        depth_report: DepthReport::All,
    };
    let report = fixpoint.run(ctx, &mut UsesPass);

    let threshold = ctx.config.nesting_depth_threshold;
    for uses in report.too_deep {
        ctx.report(
            uses,
            FindingKind::ExcessiveUsesDepth,
            format!("'uses' statement refers to 'grouping' with nesting depth > {threshold}."),
        );
    }
    for uses in report.leftovers {
        ctx.report(
            uses,
            FindingKind::CircularUsesReferences,
            "Likely circular references between 'uses' and 'grouping'.",
        );
    }

    for grouping in statements_in_schema(ctx.schema, Keyword::Grouping) {
        let name = ctx.schema.identifier(grouping).to_string();
        match ctx.schema.annotations.usage_count(grouping) {
            0 => ctx.report(
                grouping,
                FindingKind::GroupingNotUsed,
                format!("grouping statement '{name}' not used."),
            ),
            1 => ctx.report(
                grouping,
                FindingKind::GroupingUsedOnlyOnce,
                format!("grouping statement '{name}' used only once; consider inlining."),
            ),
            _ => {}
        }
    }
}

struct UsesPass;

impl FixpointPass for UsesPass {
    fn candidates(&self, ctx: &ResolutionContext<'_>) -> Vec<StatementId> {
        statements_in_schema(ctx.schema, Keyword::Uses)
            .into_iter()
            .filter(|uses| !ctx.schema.annotations.is_not_resolvable(*uses))
            .collect()
    }

    fn attempt(
        &mut self,
        ctx: &mut ResolutionContext<'_>,
        uses: StatementId,
    ) -> Result<Outcome, ResolveError> {
        expand_uses(ctx, uses)
    }
}

fn expand_uses(ctx: &mut ResolutionContext<'_>, uses: StatementId) -> Result<Outcome, ResolveError> {
    let name = ctx.schema.identifier(uses).to_string();
    if name.is_empty() {
        ctx.schema.annotations.mark_not_resolvable(uses);
        return Ok(Outcome::Failed);
    }

    let Some(grouping) = find_statement(ctx, uses, Keyword::Grouping, &name) else {
        ctx.schema.annotations.mark_not_resolvable(uses);
        ctx.report(
            uses,
            FindingKind::UnresolvableGrouping,
            format!("Cannot resolve grouping '{name}'."),
        );
        return Ok(Outcome::Failed);
    };

    if let Some(outcome) = check_nested_uses(ctx, uses, &name, grouping) {
        return Ok(outcome);
    }

    let parent = ctx
        .schema
        .arena
        .parent(uses)
        .ok_or(SchemaError::UnknownStatement(uses))?;
    let grouping_parent = ctx
        .schema
        .arena
        .parent(grouping)
        .ok_or(SchemaError::UnknownStatement(grouping))?;

    with_scratch(ctx, grouping_parent, grouping, |ctx, scratch| {
        let expanded = children_of_kinds(ctx.schema, scratch, EXPANDED_KINDS);
        let note = format!("statement placed here by 'uses' of grouping '{name}'");
        for child in &expanded {
            ctx.schema.annotations.grouping_origin.insert(*child, grouping);
            ctx.schema.annotations.add_note(*child, note.clone());
        }

        apply_status(ctx, uses, scratch)?;
        for refine in ctx.schema.arena.children_of_kind(uses, Keyword::Refine) {
            apply_refine(ctx, uses, refine, scratch, &name)?;
        }
        for augment in ctx.schema.arena.children_of_kind(uses, Keyword::Augment) {
            apply_uses_augment(ctx, augment, scratch, &name)?;
        }

        // Augments may have added nodes below the expanded ones but never new
        // top-level ones, so `expanded` is still complete here.
        for if_feature in ctx.schema.arena.children_of_kind(uses, Keyword::IfFeature) {
            clone_onto_each(ctx.schema, if_feature, &expanded)?;
        }
        if let Some(when) = ctx.schema.arena.first_child_of_kind(uses, Keyword::When) {
            for copy in clone_onto_each(ctx.schema, when, &expanded)? {
                ctx.schema.annotations.when_applies_to_parent.insert(copy);
            }
        }

        let mut position = ctx
            .schema
            .arena
            .children(parent)
            .iter()
            .position(|child| *child == uses)
            .unwrap_or(usize::MAX);
        for keyword in EXPANDED_KINDS {
            for child in ctx.schema.arena.children_of_kind(scratch, *keyword) {
                ctx.schema.arena.insert_child_at(parent, position, child)?;
                position = position.saturating_add(1);
            }
        }
        Ok(())
    })?;

    ctx.schema.arena.remove(uses)?;
    ctx.schema.annotations.increment_usage(grouping);

    log::trace!("expanded uses '{name}' at {uses} from grouping {grouping} into {parent}");
    Ok(Outcome::Resolved)
}

/// Deep-copies `grouping` next to itself and hands the copy to `work`.
/// Whatever is left of the copy is dropped afterwards, whether `work`
/// succeeds or not.
fn with_scratch<T>(
    ctx: &mut ResolutionContext<'_>,
    grouping_parent: StatementId,
    grouping: StatementId,
    work: impl FnOnce(&mut ResolutionContext<'_>, StatementId) -> Result<T, ResolveError>,
) -> Result<T, ResolveError> {
    let scratch = ctx.schema.clone_statement(Some(grouping_parent), grouping)?;
    let result = work(ctx, scratch);
    if ctx.schema.arena.contains(scratch) {
        let removed = ctx.schema.arena.remove(scratch);
        if let Err(err) = &removed {
            log::warn!("uses: could not drop scratch copy {scratch} of grouping {grouping}: {err}");
        }
        if result.is_ok() {
            removed?;
        }
    }
    result
}

/// A grouping holding a `uses` of its own is expanded only after that one
/// is. If the nested one can never resolve, neither can this one.
fn check_nested_uses(
    ctx: &mut ResolutionContext<'_>,
    uses: StatementId,
    name: &str,
    grouping: StatementId,
) -> Option<Outcome> {
    let nested = ctx.schema.arena.descendants_of_kind(grouping, Keyword::Uses);
    if nested.is_empty() {
        return None;
    }

    let mut broken = false;
    for inner in nested {
        if ctx.schema.annotations.is_not_resolvable(inner) {
            broken = true;
            let inner_name = ctx.schema.identifier(inner).to_string();
            ctx.report(
                uses,
                FindingKind::NestedUsesNotResolvable,
                format!(
                    "Referenced grouping '{name}' has nested unresolvable 'uses' statement '{inner_name}'."
                ),
            );
        }
    }

    if broken {
        ctx.schema.annotations.mark_not_resolvable(uses);
        Some(Outcome::Failed)
    } else {
        Some(Outcome::Deferred)
    }
}

/// Pushes the stricter of the `uses`' and the grouping's `status` down onto
/// the copied body.
fn apply_status(
    ctx: &mut ResolutionContext<'_>,
    uses: StatementId,
    scratch: StatementId,
) -> Result<(), ResolveError> {
    let schema = &mut *ctx.schema;
    let on_uses = schema.arena.first_child_of_kind(uses, Keyword::Status);
    let on_grouping = schema.arena.first_child_of_kind(scratch, Keyword::Status);

    let pushed = match (on_uses, on_grouping) {
        (Some(on_uses), Some(on_grouping)) => {
            if status_value(schema, on_uses) > status_value(schema, on_grouping) {
                on_uses
            } else {
                on_grouping
            }
        }
        (Some(status), None) | (None, Some(status)) => status,
        (None, None) => return Ok(()),
    };

    let targets = children_of_kinds(schema, scratch, EXPANDED_KINDS);
    push_status(schema, pushed, &targets)?;
    Ok(())
}

fn apply_refine(
    ctx: &mut ResolutionContext<'_>,
    uses: StatementId,
    refine: StatementId,
    scratch: StatementId,
    grouping_name: &str,
) -> Result<(), ResolveError> {
    let path = ctx.schema.identifier(refine).to_string();
    if path.is_empty() || path.starts_with('/') {
        return Ok(());
    }

    let Some(target) = find_schema_node_below(ctx, refine, scratch, &path) else {
        ctx.report(
            refine,
            FindingKind::UnresolvablePath,
            format!(
                "Cannot find schema node with path '{path}' for refine of grouping '{grouping_name}'."
            ),
        );
        return Ok(());
    };

    for rule in REFINE_RULES {
        apply_refine_rule(ctx, uses, refine, target, &path, rule)?;
    }
    refine_extensions(ctx, refine, target)?;
    Ok(())
}

fn apply_refine_rule(
    ctx: &mut ResolutionContext<'_>,
    uses: StatementId,
    refine: StatementId,
    target: StatementId,
    path: &str,
    rule: &RefineRule,
) -> Result<(), ResolveError> {
    let statements = ctx.schema.arena.children_of_kind(refine, rule.keyword);
    if statements.is_empty() {
        return Ok(());
    }

    let target_keyword = ctx.schema.arena.keyword(target);
    let reported_on = ctx.schema.arena.parent(uses).unwrap_or(uses);

    if let Some(allowed) = rule.targets
        && !target_keyword.is_some_and(|keyword| allowed.contains(&keyword))
    {
        let target_kind = ctx
            .schema
            .arena
            .kind(target)
            .map(ToString::to_string)
            .unwrap_or_default();
        ctx.report(
            reported_on,
            FindingKind::InvalidRefineTargetNode,
            format!(
                "Statement '{}' cannot be used to refine a '{target_kind}'.",
                rule.keyword
            ),
        );
        return Ok(());
    }

    if rule.keyword == Keyword::Default
        && statements.len() > 1
        && matches!(target_keyword, Some(Keyword::Leaf | Keyword::Choice))
    {
        ctx.report(
            reported_on,
            FindingKind::InvalidSyntax,
            format!(
                "There can only be a single instance of 'default' under refine '{path}' as the refine's target node is a leaf or choice."
            ),
        );
        return Ok(());
    }

    match rule.mode {
        RefineMode::Replace => {
            replace_children_of_kind(ctx.schema, target, &rule.keyword.into(), &statements)?;
        }
        RefineMode::Add => ctx.schema.arena.add_children(target, &statements)?,
    }
    ctx.schema
        .annotations
        .add_note(target, format!("'{}' refined by 'uses'", rule.keyword));
    Ok(())
}

/// Extensions under `refine` replace extensions of the same kind on the
/// target.
fn refine_extensions(
    ctx: &mut ResolutionContext<'_>,
    refine: StatementId,
    target: StatementId,
) -> Result<(), ResolveError> {
    let schema = &mut *ctx.schema;
    let extensions: Vec<StatementId> = schema
        .arena
        .children(refine)
        .iter()
        .copied()
        .filter(|child| schema.arena.kind(*child).is_some_and(|kind| kind.is_extension()))
        .collect();
    if extensions.is_empty() {
        return Ok(());
    }

    let refined_kinds: Vec<_> = extensions
        .iter()
        .filter_map(|extension| schema.arena.kind(*extension).cloned())
        .collect();
    let stale: Vec<StatementId> = schema
        .arena
        .children(target)
        .iter()
        .copied()
        .filter(|child| {
            schema
                .arena
                .kind(*child)
                .is_some_and(|kind| refined_kinds.contains(kind))
        })
        .collect();

    schema.arena.remove_children(target, &stale)?;
    schema.arena.add_children(target, &extensions)?;
    Ok(())
}

/// Moves the content of an `augment` under a `uses` into the copied
/// grouping body.
fn apply_uses_augment(
    ctx: &mut ResolutionContext<'_>,
    augment: StatementId,
    scratch: StatementId,
    grouping_name: &str,
) -> Result<(), ResolveError> {
    let path = ctx.schema.identifier(augment).to_string();
    if path.is_empty() || path.starts_with('/') {
        return Ok(());
    }

    let status = ctx.schema.arena.first_child_of_kind(augment, Keyword::Status);
    let augment_status = status.map_or(Status::Current, |status| status_value(ctx.schema, status));
    if augment_status == Status::Obsolete {
        ctx.schema.annotations.add_note(
            augment,
            "'augment' not applied to grouping as the augment is marked as obsolete",
        );
        return Ok(());
    }

    let Some(target) = find_schema_node_below(ctx, augment, scratch, &path) else {
        ctx.report(
            augment,
            FindingKind::UnresolvablePath,
            format!("Cannot find schema node with path '{path}' relative to the 'uses' statement."),
        );
        return Ok(());
    };

    if !ctx
        .schema
        .arena
        .keyword(target)
        .is_some_and(Keyword::is_augmentable)
    {
        let target_kind = ctx
            .schema
            .arena
            .kind(target)
            .map(ToString::to_string)
            .unwrap_or_default();
        ctx.report(
            augment,
            FindingKind::InvalidUsesAugmentTargetNode,
            format!("Statement '{target_kind}' pointed to by '{path}' cannot be augmented."),
        );
        return Ok(());
    }

    if ctx.schema.arena.is(target, Keyword::Choice) {
        inject_case_for_shorthand(ctx.schema, augment)?;
    }
    let children = children_of_kinds(ctx.schema, augment, AUGMENTED_KINDS);
    let note = format!("augmented-in into used grouping '{grouping_name}'");
    for child in &children {
        ctx.schema.annotations.add_note(*child, note.clone());
    }

    if let Some(when) = ctx.schema.arena.first_child_of_kind(augment, Keyword::When) {
        for copy in clone_onto_each(ctx.schema, when, &children)? {
            ctx.schema.annotations.when_applies_to_parent.insert(copy);
        }
    }
    for if_feature in ctx.schema.arena.children_of_kind(augment, Keyword::IfFeature) {
        clone_onto_each(ctx.schema, if_feature, &children)?;
    }
    if let Some(status) = status {
        push_status(ctx.schema, status, &children)?;
    }

    ctx.schema.arena.add_children(target, &children)?;
    Ok(())
}
