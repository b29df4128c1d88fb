//! Merging of root-level `augment` statements into their targets.

use rustc_hash::FxHashSet;
use yangkit_schema::{
    annotations::AugmentRef,
    cardinality::allows_optional_multiple,
    errors::SchemaError,
    findings::FindingKind,
    keyword::Keyword,
    statement::StatementId,
};

use crate::{
    context::ResolutionContext,
    errors::ResolveError,
    fixpoint::{DepthReport, FixpointLoop, FixpointPass, Outcome},
    fixups::{children_of_kinds, clone_onto_each, inject_case_for_shorthand, push_status},
    path::{find_schema_node, statements_at_module_roots},
};

/// Children of an `augment` that are moved to its target. Extensions stay
/// with the augment.
pub const AUGMENTED_KINDS: &[Keyword] = &[
    Keyword::Action,
    Keyword::Anydata,
    Keyword::Anyxml,
    Keyword::Case,
    Keyword::Choice,
    Keyword::Container,
    Keyword::LeafList,
    Keyword::Leaf,
    Keyword::List,
    Keyword::Notification,
];

const AUGMENTABLE_NAMES: &str =
    "'container', 'list', 'choice', 'case', 'input', 'output', 'notification'";

/// Applies every root-level augment whose target can be found, retrying
/// while augments keep creating targets for one another.
pub fn resolve_augments(ctx: &mut ResolutionContext<'_>) {
    let pending = statements_at_module_roots(ctx.schema, Keyword::Augment);
    let fixpoint = FixpointLoop {
        label: "augments",
        max_iterations: pending.len() + 1,
        depth_threshold: 0,
        depth_report: DepthReport::FirstOnly,
    };
    let mut pass = AugmentPass {
        pending,
        handled: FxHashSet::default(),
    };
    let report = fixpoint.run(ctx, &mut pass);

    for augment in report.leftovers {
        let path = ctx.schema.identifier(augment).to_string();
        ctx.report(
            augment,
            FindingKind::UnresolvablePath,
            format!("Path to schema node '{path}', part of 'augment' statement, cannot be resolved."),
        );
    }
}

struct AugmentPass {
    pending: Vec<StatementId>,
    handled: FxHashSet<StatementId>,
}

impl FixpointPass for AugmentPass {
    fn candidates(&self, ctx: &ResolutionContext<'_>) -> Vec<StatementId> {
        self.pending
            .iter()
            .copied()
            .filter(|augment| !self.handled.contains(augment) && ctx.schema.arena.contains(*augment))
            .collect()
    }

    fn attempt(
        &mut self,
        ctx: &mut ResolutionContext<'_>,
        augment: StatementId,
    ) -> Result<Outcome, ResolveError> {
        let outcome = apply_augment(ctx, augment)?;
        if outcome.made_progress() {
            self.handled.insert(augment);
        }
        Ok(outcome)
    }
}

fn apply_augment(ctx: &mut ResolutionContext<'_>, augment: StatementId) -> Result<Outcome, ResolveError> {
    let path = ctx.schema.identifier(augment).to_string();
    // An augment with nothing left to move has already been applied.
    if path.is_empty() || children_of_kinds(ctx.schema, augment, AUGMENTED_KINDS).is_empty() {
        return Ok(Outcome::Resolved);
    }

    let Some(target) = find_schema_node(ctx, augment, &path) else {
        return Ok(Outcome::Deferred);
    };

    if ctx.schema.in_same_module(augment, target) {
        ctx.report(
            augment,
            FindingKind::AugmentingSameModule,
            "Both 'augment' and its target node sit in the same (sub-)module.",
        );
    }

    let Some(target_keyword) = ctx
        .schema
        .arena
        .keyword(target)
        .filter(|keyword| keyword.is_augmentable())
    else {
        let target_kind = ctx
            .schema
            .arena
            .kind(target)
            .map(ToString::to_string)
            .unwrap_or_default();
        ctx.report(
            augment,
            FindingKind::TargetNodeCannotBeAugmented,
            format!(
                "Statement '{target_kind}' pointed to by '{path}' cannot be augmented (only statements [{AUGMENTABLE_NAMES}])."
            ),
        );
        return Ok(Outcome::Failed);
    };

    if target_keyword == Keyword::Choice {
        inject_case_for_shorthand(ctx.schema, augment)?;
    }
    let children = children_of_kinds(ctx.schema, augment, AUGMENTED_KINDS);

    for child in &children {
        let Some(child_keyword) = ctx.schema.arena.keyword(*child) else {
            continue;
        };
        if !allows_optional_multiple(target_keyword, child_keyword) {
            ctx.report(
                *child,
                FindingKind::TargetNodeCannotBeAugmented,
                format!(
                    "Statement '{child_keyword}' is not allowed under '{target_keyword}' and therefore cannot be augmented-in."
                ),
            );
            return Ok(Outcome::Failed);
        }
    }

    if let Some(when) = ctx.schema.arena.first_child_of_kind(augment, Keyword::When) {
        for copy in clone_onto_each(ctx.schema, when, &children)? {
            ctx.schema.annotations.when_applies_to_parent.insert(copy);
        }
    }
    for if_feature in ctx.schema.arena.children_of_kind(augment, Keyword::IfFeature) {
        clone_onto_each(ctx.schema, if_feature, &children)?;
    }
    if let Some(status) = ctx.schema.arena.first_child_of_kind(augment, Keyword::Status) {
        push_status(ctx.schema, status, &children)?;
    }

    let module = ctx
        .schema
        .source_module(augment)
        .ok_or(SchemaError::UnknownStatement(augment))?;
    for child in &children {
        ctx.schema
            .annotations
            .augmented_by
            .insert(*child, AugmentRef { augment, module });
        ctx.schema
            .annotations
            .add_note(*child, format!("statement augmented-in by 'augment' {augment}"));
    }
    ctx.schema.arena.add_children(target, &children)?;

    log::trace!("augment '{path}' at {augment} moved {} statement(s) into {target}", children.len());
    Ok(Outcome::Resolved)
}
