//! Flattening of derived types.
//!
//! Every `type` naming a `typedef` is replaced, in place, by a copy of the
//! typedef's own `type` with the usage's restrictions merged in. Chains of
//! typedefs are resolved innermost first by retrying until a fixpoint.

use yangkit_schema::{
    annotations::TypedefRef,
    findings::FindingKind,
    keyword::Keyword,
    statement::{StatementId, StatementKind},
};

use crate::{
    boundary::{Boundary, Limits, fits, parse_boundaries},
    context::ResolutionContext,
    data_type::{self, BuiltinType, builtin_of, is_derived},
    errors::ResolveError,
    fixpoint::{DepthReport, FixpointLoop, FixpointPass, Outcome},
    fixups::replace_children_of_kind,
    path::{find_statement, statements_in_schema},
};

/// Resolves every derived type usage in the schema, reports what is left,
/// reports unused typedefs, then collapses unions nested in unions.
pub fn resolve_derived_types(ctx: &mut ResolutionContext<'_>) {
    let fixpoint = FixpointLoop {
        label: "derived types",
        max_iterations: ctx.config.max_fixpoint_iterations,
        depth_threshold: ctx.config.nesting_depth_threshold,
        depth_report: DepthReport::FirstOnly,
    };
    let report = fixpoint.run(ctx, &mut DerivedTypePass);

    let threshold = ctx.config.nesting_depth_threshold;
    for usage in report.too_deep {
        ctx.report(
            usage,
            FindingKind::ExcessiveTypedefDepth,
            format!("Statement refers to 'typedef' with nesting depth > {threshold}."),
        );
    }
    for usage in report.leftovers {
        ctx.report(
            usage,
            FindingKind::CircularTypedefReferences,
            "Likely circular references between 'type' and 'typedef'.",
        );
    }

    report_typedef_usage(ctx);
    flatten_nested_unions(ctx);
}

struct DerivedTypePass;

impl FixpointPass for DerivedTypePass {
    fn candidates(&self, ctx: &ResolutionContext<'_>) -> Vec<StatementId> {
        let schema = &*ctx.schema;
        statements_in_schema(schema, Keyword::Type)
            .into_iter()
            .filter(|usage| {
                is_derived(schema.identifier(*usage)) && !schema.annotations.is_not_resolvable(*usage)
            })
            .collect()
    }

    fn attempt(
        &mut self,
        ctx: &mut ResolutionContext<'_>,
        usage: StatementId,
    ) -> Result<Outcome, ResolveError> {
        resolve_type_usage(ctx, usage)
    }
}

fn resolve_type_usage(
    ctx: &mut ResolutionContext<'_>,
    usage: StatementId,
) -> Result<Outcome, ResolveError> {
    let name = ctx.schema.identifier(usage).to_string();

    let Some(typedef) = find_statement(ctx, usage, Keyword::Typedef, &name) else {
        ctx.schema.annotations.mark_not_resolvable(usage);
        ctx.report(
            usage,
            FindingKind::UnresolvableDerivedType,
            format!("Cannot resolve typedef '{name}'."),
        );
        return Ok(Outcome::Failed);
    };

    let base_type = ctx
        .schema
        .arena
        .first_child_of_kind(typedef, Keyword::Type)
        .ok_or_else(|| ResolveError::MissingMandatoryChild {
            parent_keyword: Keyword::Typedef.to_string(),
            parent: typedef,
            child: "type",
        })?;

    if let Some(outcome) = check_nested_types(ctx, usage, &name, base_type) {
        return Ok(outcome);
    }

    if let Some(module) = ctx
        .schema
        .tree_module(typedef)
        .and_then(|module| ctx.schema.module_name(module))
        .map(str::to_string)
    {
        ctx.schema
            .annotations
            .originally_defined_in
            .insert(base_type, module);
    }

    let clone = ctx.schema.clone_statement(None, base_type)?;
    restrict_patterns(ctx, usage, clone)?;
    restrict_length(ctx, usage, clone)?;
    restrict_range(ctx, usage, clone)?;
    restrict_members(ctx, usage, clone, MemberKind::Bits)?;
    restrict_members(ctx, usage, clone, MemberKind::Enums)?;

    propagate_default(ctx, typedef, usage)?;
    ctx.schema.arena.replace_child_in_place(usage, clone)?;
    record_typedef_reference(ctx, clone, typedef);
    ctx.schema.annotations.increment_usage(typedef);

    log::trace!("flattened type '{name}' at {usage} into {clone} from typedef {typedef}");
    Ok(Outcome::Resolved)
}

/// Defers while the typedef's own type (or one of its union members) is still
/// derived, and fails when one of them can never resolve.
fn check_nested_types(
    ctx: &mut ResolutionContext<'_>,
    usage: StatementId,
    name: &str,
    base_type: StatementId,
) -> Option<Outcome> {
    let mut nested = vec![base_type];
    nested.extend(ctx.schema.arena.children_of_kind(base_type, Keyword::Type));

    let mut still_derived = false;
    let mut broken = false;
    for member in nested {
        if ctx.schema.annotations.is_not_resolvable(member) {
            broken = true;
            let member_name = ctx.schema.identifier(member).to_string();
            ctx.report(
                usage,
                FindingKind::NestedDerivedTypeNotResolvable,
                format!(
                    "Referenced typedef '{name}' has nested unresolvable 'type' statement '{member_name}'."
                ),
            );
        }
        still_derived |= is_derived(ctx.schema.identifier(member));
    }

    if broken {
        ctx.schema.annotations.mark_not_resolvable(usage);
        Some(Outcome::Failed)
    } else if still_derived {
        Some(Outcome::Deferred)
    } else {
        None
    }
}

fn illegal_category(ctx: &mut ResolutionContext<'_>, usage: StatementId, message: &str) {
    let target = ctx.schema.arena.parent(usage).unwrap_or(usage);
    ctx.report(target, FindingKind::IllegalDataTypeRestriction, message);
}

/// Patterns are ANDed, so the usage's simply join the base's.
fn restrict_patterns(
    ctx: &mut ResolutionContext<'_>,
    usage: StatementId,
    clone: StatementId,
) -> Result<(), ResolveError> {
    let patterns = ctx.schema.arena.children_of_kind(usage, Keyword::Pattern);
    if patterns.is_empty() {
        return Ok(());
    }
    if builtin_of(ctx.schema, clone) != Some(BuiltinType::String) {
        illegal_category(
            ctx,
            usage,
            "Base type of derived type is not 'string'; hence cannot use 'pattern' as substatement to restrict the type.",
        );
        return Ok(());
    }
    ctx.schema.arena.add_children(clone, &patterns)?;
    Ok(())
}

fn restrict_length(
    ctx: &mut ResolutionContext<'_>,
    usage: StatementId,
    clone: StatementId,
) -> Result<(), ResolveError> {
    let Some(length) = ctx.schema.arena.first_child_of_kind(usage, Keyword::Length) else {
        return Ok(());
    };
    if !builtin_of(ctx.schema, clone).is_some_and(BuiltinType::takes_length) {
        illegal_category(
            ctx,
            usage,
            "Base type of derived type is not 'string' or 'binary'; hence cannot use 'length' as substatement to restrict the type.",
        );
        return Ok(());
    }
    narrow_boundaries(ctx, clone, length, Keyword::Length, Limits::length())
}

fn restrict_range(
    ctx: &mut ResolutionContext<'_>,
    usage: StatementId,
    clone: StatementId,
) -> Result<(), ResolveError> {
    let Some(range) = ctx.schema.arena.first_child_of_kind(usage, Keyword::Range) else {
        return Ok(());
    };
    let limits = builtin_of(ctx.schema, clone)
        .and_then(|builtin| builtin.range_limits(data_type::fraction_digits(ctx.schema, clone)));
    let Some(limits) = limits else {
        illegal_category(
            ctx,
            usage,
            "Base type of derived type is not a numeric type; hence cannot use 'range' as substatement to restrict the type.",
        );
        return Ok(());
    };
    narrow_boundaries(ctx, clone, range, Keyword::Range, limits)
}

/// Checks that every pair of `restriction` fits into a single pair of the
/// base type's restriction, then puts `restriction` on the clone regardless.
fn narrow_boundaries(
    ctx: &mut ResolutionContext<'_>,
    clone: StatementId,
    restriction: StatementId,
    keyword: Keyword,
    limits: Limits,
) -> Result<(), ResolveError> {
    if let Some(base) = ctx.schema.arena.first_child_of_kind(clone, keyword) {
        let allowed = boundaries_of(ctx, base, limits);
        for boundary in boundaries_of(ctx, restriction, limits) {
            if !fits(&boundary, &allowed) {
                ctx.report(
                    restriction,
                    FindingKind::IllegalDataTypeRestriction,
                    format!(
                        "When using a derived type and specifying '{keyword}', the allowed values can only become more restrictive, not wider ('{boundary}' is outside the base type's '{keyword}')."
                    ),
                );
            }
        }
    }
    replace_children_of_kind(ctx.schema, clone, &StatementKind::Yang(keyword), &[restriction])?;
    Ok(())
}

/// Malformed expressions count as having no boundaries.
fn boundaries_of(ctx: &ResolutionContext<'_>, statement: StatementId, limits: Limits) -> Vec<Boundary> {
    parse_boundaries(ctx.schema.identifier(statement), limits, statement).unwrap_or_else(|err| {
        log::warn!("{err}");
        Vec::new()
    })
}

#[derive(Debug, Clone, Copy)]
enum MemberKind {
    Bits,
    Enums,
}

impl MemberKind {
    fn builtin(self) -> BuiltinType {
        match self {
            MemberKind::Bits => BuiltinType::Bits,
            MemberKind::Enums => BuiltinType::Enumeration,
        }
    }

    fn member(self) -> Keyword {
        match self {
            MemberKind::Bits => Keyword::Bit,
            MemberKind::Enums => Keyword::Enum,
        }
    }

    fn number(self) -> Keyword {
        match self {
            MemberKind::Bits => Keyword::Position,
            MemberKind::Enums => Keyword::Value,
        }
    }

    fn label(self) -> &'static str {
        match self {
            MemberKind::Bits => "Bit",
            MemberKind::Enums => "Enum",
        }
    }

    fn numbering(
        self,
        schema: &yangkit_schema::Schema,
        type_statement: StatementId,
    ) -> rustc_hash::FxHashMap<String, i64> {
        match self {
            MemberKind::Bits => data_type::bit_positions(schema, type_statement),
            MemberKind::Enums => data_type::enum_values(schema, type_statement),
        }
    }
}

/// Restricting `bits` or an `enumeration` may only pick members of the base,
/// and their positions/values must agree with the base's.
fn restrict_members(
    ctx: &mut ResolutionContext<'_>,
    usage: StatementId,
    clone: StatementId,
    kind: MemberKind,
) -> Result<(), ResolveError> {
    let members = ctx.schema.arena.children_of_kind(usage, kind.member());
    if members.is_empty() {
        return Ok(());
    }
    if builtin_of(ctx.schema, clone) != Some(kind.builtin()) {
        let message = format!(
            "Base type of derived type is not '{}'; hence cannot use '{}' as substatement to restrict the type.",
            kind.builtin().as_str(),
            kind.member()
        );
        illegal_category(ctx, usage, &message);
        return Ok(());
    }

    let base_numbering = kind.numbering(ctx.schema, clone);
    for member in &members {
        if ctx.schema.arena.has_child_of_kind(*member, kind.number()) {
            continue;
        }
        let inherited = base_numbering
            .get(ctx.schema.identifier(*member))
            .copied()
            .unwrap_or(0);
        let line = ctx.schema.arena.statement(*member)?.origin().line;
        ctx.schema.arena.add_child(
            *member,
            kind.number().into(),
            Some(inherited.to_string()),
            line,
        )?;
    }

    let own_numbering = kind.numbering(ctx.schema, usage);
    for member in &members {
        let member_name = ctx.schema.identifier(*member).to_string();
        let Some(base_value) = base_numbering.get(&member_name).copied() else {
            ctx.report(
                *member,
                FindingKind::IllegalDataTypeRestriction,
                format!("{} '{member_name}' does not exist in derived type.", kind.label()),
            );
            continue;
        };
        let own_value = own_numbering.get(&member_name).copied().unwrap_or(base_value);
        if own_value != base_value {
            ctx.report(
                *member,
                FindingKind::IllegalDataTypeRestriction,
                format!(
                    "'{}' mismatch for {} '{member_name}'. In derived type: '{base_value}'; in type using the derived type: '{own_value}'.",
                    kind.number(),
                    kind.member()
                ),
            );
        }
    }

    replace_children_of_kind(ctx.schema, clone, &StatementKind::Yang(kind.member()), &members)?;
    Ok(())
}

/// Copies the typedef's `default` to the leaf, leaf-list or typedef using it,
/// unless that already has one. A union member defers to the union's parent.
fn propagate_default(
    ctx: &mut ResolutionContext<'_>,
    typedef: StatementId,
    usage: StatementId,
) -> Result<(), ResolveError> {
    let Some(default) = ctx.schema.arena.first_child_of_kind(typedef, Keyword::Default) else {
        return Ok(());
    };
    let Some(mut target) = ctx.schema.arena.parent(usage) else {
        return Ok(());
    };
    if ctx.schema.arena.is(target, Keyword::Type)
        && let Some(grandparent) = ctx.schema.arena.parent(target)
    {
        target = grandparent;
    }

    let accepts_default = matches!(
        ctx.schema.arena.keyword(target),
        Some(Keyword::Leaf | Keyword::LeafList | Keyword::Typedef)
    );
    if accepts_default && !ctx.schema.arena.has_child_of_kind(target, Keyword::Default) {
        ctx.schema.clone_statement(Some(target), default)?;
    }
    Ok(())
}

/// Remembers the typedef behind a flattened type. Only root-level typedefs
/// have a global identity and enter the chain.
fn record_typedef_reference(ctx: &mut ResolutionContext<'_>, clone: StatementId, typedef: StatementId) {
    let schema = &mut *ctx.schema;
    schema.annotations.typedef_origin.insert(clone, typedef);

    let Some(parent) = schema.arena.parent(typedef) else {
        return;
    };
    let Some(module) = schema.registry.by_root(parent) else {
        return;
    };
    let owner = schema.registry.owning_module(module).unwrap_or(module);
    let reference = TypedefRef {
        namespace: schema.registry.namespace_of(module).unwrap_or_default().to_string(),
        module: schema.module_name(owner).unwrap_or_default().to_string(),
        name: schema.identifier(typedef).to_string(),
    };
    schema
        .annotations
        .typedef_chain
        .entry(clone)
        .or_default()
        .push(reference);
}

fn report_typedef_usage(ctx: &mut ResolutionContext<'_>) {
    for typedef in statements_in_schema(ctx.schema, Keyword::Typedef) {
        let name = ctx.schema.identifier(typedef).to_string();
        match ctx.schema.annotations.usage_count(typedef) {
            0 => ctx.report(
                typedef,
                FindingKind::TypedefNotUsed,
                format!("typedef statement '{name}' not used."),
            ),
            1 => ctx.report(
                typedef,
                FindingKind::TypedefUsedOnlyOnce,
                format!("typedef statement '{name}' used only once; consider inlining."),
            ),
            _ => {}
        }
    }
}

/// Replaces union members that are unions themselves by their own members,
/// keeping the overall member order.
pub fn flatten_nested_unions(ctx: &mut ResolutionContext<'_>) {
    for iteration in 1..=ctx.config.max_fixpoint_iterations.max(1) {
        let mut changed = false;
        for union in statements_in_schema(ctx.schema, Keyword::Type) {
            match flatten_union(ctx, union) {
                Ok(flattened) => changed |= flattened,
                Err(err) => log::warn!("union flattening: skipping {union}: {err}"),
            }
        }
        log::debug!("union flattening: iteration {iteration}, changed: {changed}");
        if !changed {
            break;
        }
    }
}

fn flatten_union(ctx: &mut ResolutionContext<'_>, union: StatementId) -> Result<bool, ResolveError> {
    let schema = &mut *ctx.schema;
    if !schema.arena.contains(union) || builtin_of(schema, union) != Some(BuiltinType::Union) {
        return Ok(false);
    }
    let members = schema.arena.children_of_kind(union, Keyword::Type);
    let is_union = |schema: &yangkit_schema::Schema, member: StatementId| {
        builtin_of(schema, member) == Some(BuiltinType::Union)
    };
    if !members.iter().any(|member| is_union(schema, *member)) {
        return Ok(false);
    }

    for member in members {
        if is_union(schema, member) {
            let nested = schema.arena.children_of_kind(member, Keyword::Type);
            schema.arena.add_children(union, &nested)?;
            schema.arena.remove(member)?;
        } else {
            schema.arena.move_child(member, union)?;
        }
    }
    log::trace!("flattened nested union under {union}");
    Ok(true)
}
