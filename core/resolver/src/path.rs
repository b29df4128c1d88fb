//! Schema-node identifiers and definition lookup across module boundaries.
//!
//! Nothing here treats `choice`/`case` as transparent; callers that need
//! shorthand handling take care of it themselves. A segment that cannot be
//! found yields `None` without a finding since the node may simply not have
//! been augmented in yet. Only unresolvable prefixes are reported.

use core::fmt;
use std::fmt::{Display, Formatter};

use yangkit_schema::{
    Schema,
    findings::FindingKind,
    keyword::Keyword,
    registry::ModuleId,
    statement::StatementId,
};

use crate::{context::ResolutionContext, scope::ScopeChain};

/// An identifier with an optional `prefix:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub prefix: Option<String>,
    pub name: String,
}

impl QualifiedName {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match text.trim().split_once(':') {
            Some((prefix, name)) => Self {
                prefix: Some(prefix.to_string()),
                name: name.to_string(),
            },
            None => Self {
                prefix: None,
                name: text.trim().to_string(),
            },
        }
    }

    #[must_use]
    pub fn has_prefix(&self) -> bool {
        self.prefix.is_some()
    }
}

impl Display for QualifiedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A parsed absolute (`/a:x/a:y`) or relative (`x/y`) schema-node identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNodePath {
    pub absolute: bool,
    pub segments: Vec<QualifiedName>,
}

impl SchemaNodePath {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let absolute = text.starts_with('/');
        let segments = text
            .split('/')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(QualifiedName::parse)
            .collect();
        Self { absolute, segments }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl Display for SchemaNodePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.absolute {
            write!(f, "/")?;
        }
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                write!(f, "/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Result of following a schema-node path as far as it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathTrace {
    Found(StatementId),
    /// `segment` is not a child of `reached`.
    Missing {
        reached: StatementId,
        segment: QualifiedName,
    },
    /// The path is empty or its first prefix cannot be resolved.
    Unusable,
}

/// Resolves `path` as written in `statement`: absolute paths start at a
/// module root, relative ones at `statement` itself.
pub fn find_schema_node(
    ctx: &mut ResolutionContext<'_>,
    statement: StatementId,
    path: &str,
) -> Option<StatementId> {
    match trace_schema_node(ctx, statement, path) {
        PathTrace::Found(node) => Some(node),
        PathTrace::Missing { .. } | PathTrace::Unusable => None,
    }
}

/// Like [`find_schema_node`], but tells where the walk stopped.
pub fn trace_schema_node(
    ctx: &mut ResolutionContext<'_>,
    statement: StatementId,
    path: &str,
) -> PathTrace {
    let parsed = SchemaNodePath::parse(path);
    if parsed.is_empty() {
        return PathTrace::Unusable;
    }
    let Some(start) = starting_node(ctx, statement, &parsed) else {
        return PathTrace::Unusable;
    };

    let mut current = start;
    for segment in &parsed.segments {
        match find_child_schema_node(ctx, current, segment, statement) {
            Some(child) => current = child,
            None => {
                return PathTrace::Missing {
                    reached: current,
                    segment: segment.clone(),
                };
            }
        }
    }
    PathTrace::Found(current)
}

/// Resolves a relative `path` below `start`. Prefixes are looked up in the
/// module that wrote `statement`.
pub fn find_schema_node_below(
    ctx: &mut ResolutionContext<'_>,
    statement: StatementId,
    start: StatementId,
    path: &str,
) -> Option<StatementId> {
    let parsed = SchemaNodePath::parse(path);
    if parsed.is_empty() || parsed.absolute {
        return None;
    }
    walk(ctx, statement, start, &parsed.segments)
}

fn starting_node(
    ctx: &mut ResolutionContext<'_>,
    statement: StatementId,
    path: &SchemaNodePath,
) -> Option<StatementId> {
    if !path.absolute {
        return Some(statement);
    }
    let first = path.segments.first()?;
    let Some(prefix) = &first.prefix else {
        return Some(ctx.schema.arena.root_of(statement));
    };
    let module = resolve_prefix_or_report(ctx, statement, prefix, &first.to_string())?;
    ctx.schema.registry.root(module)
}

fn walk(
    ctx: &mut ResolutionContext<'_>,
    statement: StatementId,
    start: StatementId,
    segments: &[QualifiedName],
) -> Option<StatementId> {
    let mut current = start;
    for segment in segments {
        current = find_child_schema_node(ctx, current, segment, statement)?;
    }
    Some(current)
}

/// Direct child of `parent` that defines a schema node called `segment`. A
/// prefixed segment must also match the child's effective namespace.
pub fn find_child_schema_node(
    ctx: &mut ResolutionContext<'_>,
    parent: StatementId,
    segment: &QualifiedName,
    statement: StatementId,
) -> Option<StatementId> {
    let sought_namespace = match &segment.prefix {
        Some(prefix) => {
            let module = resolve_prefix_or_report(ctx, statement, prefix, &segment.to_string())?;
            ctx.schema.registry.namespace_of(module).map(str::to_string)
        }
        None => None,
    };

    let schema = &*ctx.schema;
    schema.arena.children(parent).iter().copied().find(|child| {
        schema_node_name(schema, *child) == Some(segment.name.as_str())
            && sought_namespace
                .as_deref()
                .is_none_or(|namespace| schema.effective_namespace(*child) == Some(namespace))
    })
}

/// The name a path segment uses for `node`: its identifier, or the keyword
/// for the argument-less `input` and `output`. `None` for non-schema nodes.
#[must_use]
pub fn schema_node_name(schema: &Schema, node: StatementId) -> Option<&str> {
    match schema.arena.keyword(node)? {
        keyword @ (Keyword::Input | Keyword::Output) => Some(keyword.as_str()),
        keyword if keyword.defines_schema_node() => Some(schema.identifier(node)),
        _ => None,
    }
}

/// Finds the `keyword` definition (a `typedef` or `grouping`) that the
/// possibly prefixed `reference` in `statement` points at.
pub fn find_statement(
    ctx: &mut ResolutionContext<'_>,
    statement: StatementId,
    keyword: Keyword,
    reference: &str,
) -> Option<StatementId> {
    let name = QualifiedName::parse(reference);
    let source = ctx.schema.source_module(statement)?;
    let sought_module = match &name.prefix {
        Some(prefix) => resolve_prefix_or_report(ctx, statement, prefix, reference)?,
        None => source,
    };

    let schema = &*ctx.schema;
    let tree_module = schema.tree_module(statement).unwrap_or(source);
    let chain = if same_owner(schema, sought_module, tree_module) {
        ScopeChain::enclosing(schema, statement, tree_module)
    } else {
        ScopeChain::module_level(schema, sought_module)
    };
    chain.find(schema, keyword, &name.name)
}

fn same_owner(schema: &Schema, a: ModuleId, b: ModuleId) -> bool {
    schema.registry.owning_module(a).unwrap_or(a) == schema.registry.owning_module(b).unwrap_or(b)
}

/// Resolves `prefix` through the prefix table of the module that wrote
/// `statement`, reporting an unresolvable prefix on failure.
pub fn resolve_prefix_or_report(
    ctx: &mut ResolutionContext<'_>,
    statement: StatementId,
    prefix: &str,
    context: &str,
) -> Option<ModuleId> {
    let source = ctx.schema.source_module(statement)?;
    if let Some(module) = ctx.schema.registry.resolve_prefix(source, prefix) {
        return Some(module);
    }

    let unbound_import = ctx
        .schema
        .registry
        .get(source)
        .and_then(|info| info.imports().iter().find(|import| import.prefix == prefix))
        .map(|import| import.module_name.clone());
    let message = match unbound_import {
        Some(module_name) => format!(
            "Prefix '{prefix}' in '{context}' resolves to module '{module_name}' but this is either not found in the input or is ambiguous."
        ),
        None => format!("Prefix '{prefix}' in '{context}' cannot be resolved."),
    };
    ctx.report(statement, FindingKind::UnresolvablePrefix, message);
    None
}

/// Every `keyword` statement in every module tree, in module load order and
/// pre-order within a tree.
#[must_use]
pub fn statements_in_schema(schema: &Schema, keyword: Keyword) -> Vec<StatementId> {
    schema
        .registry
        .modules()
        .flat_map(|info| schema.arena.descendants_of_kind(info.root(), keyword))
        .collect()
}

/// The `keyword` statements sitting directly under a module or submodule root.
#[must_use]
pub fn statements_at_module_roots(schema: &Schema, keyword: Keyword) -> Vec<StatementId> {
    schema
        .registry
        .modules()
        .flat_map(|info| schema.arena.children_of_kind(info.root(), keyword))
        .collect()
}
