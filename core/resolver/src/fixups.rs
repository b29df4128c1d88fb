//! Structural clean-ups run before and after the resolvers.

use yangkit_schema::{
    Schema,
    errors::SchemaError,
    keyword::Keyword,
    statement::{Origin, StatementId, StatementKind, Status},
};

use crate::{context::ResolutionContext, errors::ResolveError, path::statements_in_schema};

/// Root-level statements of a submodule that move into the owning module.
const MERGED_FROM_SUBMODULE: &[Keyword] = &[
    Keyword::Anydata,
    Keyword::Anyxml,
    Keyword::Augment,
    Keyword::Choice,
    Keyword::Container,
    Keyword::Deviation,
    Keyword::Extension,
    Keyword::Feature,
    Keyword::Grouping,
    Keyword::Identity,
    Keyword::LeafList,
    Keyword::Leaf,
    Keyword::List,
    Keyword::Notification,
    Keyword::Rpc,
    Keyword::Typedef,
    Keyword::Uses,
];

/// Moves the body of every linked submodule into its owning module. The moved
/// statements keep their origin, so their prefixes still resolve through the
/// submodule's own imports.
///
/// # Errors
///
/// Propagates arena errors; none are expected on a linked schema.
pub fn merge_submodules(ctx: &mut ResolutionContext<'_>) -> Result<(), ResolveError> {
    let pairs: Vec<(StatementId, StatementId)> = ctx
        .schema
        .registry
        .modules()
        .filter(|info| info.is_submodule())
        .filter_map(|info| {
            let owner = ctx.schema.registry.owning_module(info.id())?;
            Some((info.root(), ctx.schema.registry.root(owner)?))
        })
        .collect();

    for (submodule_root, owner_root) in pairs {
        for keyword in MERGED_FROM_SUBMODULE {
            let moved = ctx.schema.arena.children_of_kind(submodule_root, *keyword);
            ctx.schema.arena.add_children(owner_root, &moved)?;
        }
        log::trace!("merged submodule {submodule_root} into {owner_root}");
    }
    Ok(())
}

/// Wraps every shorthand child of every `choice` in a `case`.
///
/// # Errors
///
/// Propagates arena errors.
pub fn fix_omitted_cases(ctx: &mut ResolutionContext<'_>) -> Result<(), ResolveError> {
    for choice in statements_in_schema(ctx.schema, Keyword::Choice) {
        inject_case_for_shorthand(ctx.schema, choice)?;
    }
    Ok(())
}

/// Puts each shorthand data node directly under `parent` into a new `case`
/// named after it, at the same position. The node's `if-feature`s are copied
/// onto the case. Returns the created cases.
///
/// # Errors
///
/// Returns [`SchemaError::UnknownStatement`] if `parent` is not in the arena.
pub fn inject_case_for_shorthand(
    schema: &mut Schema,
    parent: StatementId,
) -> Result<Vec<StatementId>, SchemaError> {
    let shorthand: Vec<StatementId> = schema
        .arena
        .children(parent)
        .iter()
        .copied()
        .filter(|child| {
            schema
                .arena
                .keyword(*child)
                .is_some_and(Keyword::may_be_shorthand_case)
        })
        .collect();

    let mut cases = Vec::with_capacity(shorthand.len());
    for node in shorthand {
        let statement = schema.arena.statement(node)?;
        let origin: Origin = statement.origin();
        let name = statement.trimmed_argument().to_string();
        let position = schema
            .arena
            .children(parent)
            .iter()
            .position(|child| *child == node)
            .unwrap_or(usize::MAX);

        let case = schema.arena.add_child_with_origin(
            parent,
            StatementKind::Yang(Keyword::Case),
            Some(name),
            origin,
        )?;
        schema.arena.insert_child_at(parent, position, case)?;
        schema.arena.move_child(node, case)?;
        for if_feature in schema.arena.children_of_kind(node, Keyword::IfFeature) {
            schema.clone_statement(Some(case), if_feature)?;
        }
        schema
            .annotations
            .add_note(case, "originally omitted 'case' statement inserted");
        cases.push(case);
    }
    Ok(cases)
}

/// Gives every `rpc` and `action` an `input` and an `output`.
///
/// # Errors
///
/// Propagates arena errors.
pub fn fix_missing_input_output(ctx: &mut ResolutionContext<'_>) -> Result<(), ResolveError> {
    let mut operations = statements_in_schema(ctx.schema, Keyword::Rpc);
    operations.extend(statements_in_schema(ctx.schema, Keyword::Action));

    for operation in operations {
        let origin = ctx.schema.arena.statement(operation)?.origin();
        for keyword in [Keyword::Input, Keyword::Output] {
            if !ctx.schema.arena.has_child_of_kind(operation, keyword) {
                ctx.schema
                    .arena
                    .add_child_with_origin(operation, keyword.into(), None, origin)?;
            }
        }
    }
    Ok(())
}

/// Records the effective status of every statement: the more restrictive of
/// its own `status` and its parent's effective status.
pub fn assign_status(schema: &mut Schema) {
    let roots: Vec<StatementId> = schema.registry.modules().map(|info| info.root()).collect();
    for root in roots {
        let mut stack = vec![(root, Status::Current)];
        while let Some((statement, inherited)) = stack.pop() {
            let effective = schema
                .explicit_status(statement)
                .map_or(inherited, |own| own.max(inherited));
            schema.annotations.effective_status.insert(statement, effective);
            stack.extend(
                schema
                    .arena
                    .children(statement)
                    .iter()
                    .map(|child| (*child, effective)),
            );
        }
    }
}

/// Every statement takes the namespace of the module its tree belongs to; a
/// submodule tree takes its owner's.
pub fn assign_effective_namespaces(schema: &mut Schema) {
    let trees: Vec<_> = schema
        .registry
        .modules()
        .map(|info| {
            let module = schema.registry.owning_module(info.id()).unwrap_or(info.id());
            (info.root(), module)
        })
        .collect();
    for (root, module) in trees {
        for statement in schema.arena.descendants(root) {
            schema.annotations.effective_namespace.insert(statement, module);
        }
    }
}

/// `config` defaults to true; `config false` holds for the whole subtree.
pub fn assign_config(schema: &mut Schema) {
    let roots: Vec<StatementId> = schema.registry.modules().map(|info| info.root()).collect();
    for root in roots {
        let mut stack = vec![(root, true)];
        while let Some((statement, inherited)) = stack.pop() {
            let own = schema
                .arena
                .first_child_of_kind(statement, Keyword::Config)
                .map(|config| schema.identifier(config) != "false");
            let effective = inherited && own.unwrap_or(true);
            schema.annotations.effective_config.insert(statement, effective);
            stack.extend(
                schema
                    .arena
                    .children(statement)
                    .iter()
                    .map(|child| (*child, effective)),
            );
        }
    }
}

/// Drops every child of `parent` of the given kind and appends
/// `replacements` (moved from wherever they hang) in their place.
///
/// # Errors
///
/// Propagates arena errors.
pub fn replace_children_of_kind(
    schema: &mut Schema,
    parent: StatementId,
    kind: &StatementKind,
    replacements: &[StatementId],
) -> Result<(), SchemaError> {
    let stale: Vec<StatementId> = schema
        .arena
        .children_matching(parent, kind)
        .into_iter()
        .filter(|child| !replacements.contains(child))
        .collect();
    schema.arena.remove_children(parent, &stale)?;
    schema.arena.add_children(parent, replacements)
}

/// Direct children of `parent` whose keyword is one of `kinds`, in tree order.
#[must_use]
pub fn children_of_kinds(schema: &Schema, parent: StatementId, kinds: &[Keyword]) -> Vec<StatementId> {
    schema
        .arena
        .children(parent)
        .iter()
        .copied()
        .filter(|child| {
            schema
                .arena
                .keyword(*child)
                .is_some_and(|keyword| kinds.contains(&keyword))
        })
        .collect()
}

/// Deep-copies `template` under each of `targets`.
///
/// # Errors
///
/// Propagates arena errors.
pub fn clone_onto_each(
    schema: &mut Schema,
    template: StatementId,
    targets: &[StatementId],
) -> Result<Vec<StatementId>, SchemaError> {
    targets
        .iter()
        .map(|target| schema.clone_statement(Some(*target), template))
        .collect()
}

/// The value of a `status` statement; unknown values count as `current`.
#[must_use]
pub fn status_value(schema: &Schema, status: StatementId) -> Status {
    schema.identifier(status).parse().unwrap_or_default()
}

/// Pushes a copy of the `status` statement onto every target whose own
/// explicit status is absent or less restrictive.
///
/// # Errors
///
/// Propagates arena errors.
pub fn push_status(
    schema: &mut Schema,
    status: StatementId,
    targets: &[StatementId],
) -> Result<(), SchemaError> {
    let pushed = status_value(schema, status);
    for target in targets {
        if schema.arena.is(*target, Keyword::Status) {
            continue;
        }
        let existing = schema.arena.children_of_kind(*target, Keyword::Status);
        if existing
            .first()
            .is_some_and(|own| status_value(schema, *own) >= pushed)
        {
            continue;
        }
        schema.arena.remove_children(*target, &existing)?;
        schema.clone_statement(Some(*target), status)?;
        schema
            .annotations
            .add_note(*target, format!("'status {pushed}' inherited from the enclosing statement"));
    }
    Ok(())
}
