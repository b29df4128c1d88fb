#![warn(clippy::pedantic)]
//! Schema resolution for YANG statement trees
//!
//! This crate takes the statement trees of a set of loaded YANG modules and
//! rewrites them in place into their resolved form, reporting every problem it
//! meets as a finding rather than failing.
//!
//! ## Core Features
//!
//! **Derived types**:
//! - Every `type` naming a `typedef` is replaced by a copy of the typedef's own type
//! - `pattern`, `length`, `range`, `bit` and `enum` restrictions are merged and checked
//! - Typedef defaults propagate to the leaf, leaf-list or typedef using them
//! - Unions nested in unions are flattened, keeping member order
//!
//! **Groupings**:
//! - Every `uses` is expanded into a fresh copy of its grouping's data nodes
//! - `refine`, nested `augment`, `if-feature`, `when` and `status` are applied to the copy
//! - The grouping itself is never modified
//!
//! **Augments and deviations**:
//! - Root-level augments are merged into their targets, retrying while augments
//!   create targets for one another
//! - Deviations are applied in four schema-wide phases: add, replace, delete, not-supported
//!
//! **Findings**:
//! - Unresolvable references, cycles, illegal placements and narrowing are findings
//! - The same finding on the same statement is forwarded once
//! - Unexpected tree states are logged and only skip the candidate that hit them
//!
//! ## Quick Start
//!
//! Use [`SchemaResolverBuilder`] to resolve a populated schema:
//!
//! ```ignore
//! use yangkit_resolver::{SchemaResolverBuilder, config::ResolverConfig};
//! use yangkit_schema::findings::FindingKind;
//!
//! let schema = load_modules(sources)?;
//!
//! let resolved = SchemaResolverBuilder::build_resolved_schema(schema, &ResolverConfig::default())?
//!     .resolved_schema();
//!
//! for finding in resolved.findings.of_kind(FindingKind::UnresolvableDerivedType) {
//!     println!("{finding}");
//! }
//! ```
//!
//! ## Resolution Phases
//!
//! The driver runs these phases in order; the bracketed ones can be switched
//! off through [`config::ResolverConfig`]:
//!
//! 1. **Link modules** - Bind imports and submodules to loaded modules
//! 2. **Merge submodules** - Move submodule bodies into their owning modules [`fixups::merge_submodules`]
//! 3. **Fix up cases** - Wrap shorthand `choice` members in a `case`
//! 4. **Fix up operations** - Give every `rpc`/`action` an `input` and an `output`
//! 5. **Assign status** - Record effective status before content moves around
//! 6. **Resolve types, then uses** [`type_resolver`], [`uses_resolver`]
//! 7. **Assign namespaces** - Record effective namespaces of the expanded trees
//! 8. **Resolve augments** [`augment_resolver::resolve_augments`]
//! 9. **Resolve deviations** [`deviation_resolver::resolve_deviations`]
//! 10. **Assign status and config** - Record final effective status and config
//!
//! Types go before uses so that groupings are copied with their types already
//! flattened, and namespaces are assigned before augments so that prefixed
//! path segments can be matched against expanded nodes.
//!
//! ## Public Modules
//!
//! - [`type_resolver`], [`uses_resolver`], [`augment_resolver`], [`deviation_resolver`] - The resolvers
//! - [`fixups`] - Structural clean-ups shared by the resolvers and the driver
//! - [`path`] - Schema-node identifiers and definition lookup
//! - [`fixpoint`] - Bounded retry loop for mutually dependent candidates
//! - [`config`] - Execution flags
//! - [`errors`] - Internal error type, never surfaced as a finding

use std::marker::PhantomData;

use yangkit_schema::{
    Schema,
    findings::{FindingSink, Findings},
};

use crate::{config::ResolverConfig, context::ResolutionContext};

pub mod augment_resolver;
pub mod boundary;
pub mod config;
pub mod context;
pub mod data_type;
pub mod deviation_resolver;
pub mod errors;
pub mod fixpoint;
pub mod fixups;
pub mod path;
pub mod reporter;
pub mod scope;
pub mod type_resolver;
pub mod uses_resolver;

/// Runs every enabled resolution phase over `schema`, sending findings to
/// `sink`.
pub fn resolve_schema(schema: &mut Schema, config: &ResolverConfig, sink: &mut dyn FindingSink) {
    schema.link_modules();
    let mut ctx = ResolutionContext::new(schema, config, sink);

    if config.merge_submodules {
        log::debug!("phase: merge submodules");
        run_fixup(&mut ctx, "merge submodules", fixups::merge_submodules);
    }
    log::debug!("phase: structural fix-ups");
    run_fixup(&mut ctx, "omitted cases", fixups::fix_omitted_cases);
    run_fixup(&mut ctx, "missing input/output", fixups::fix_missing_input_output);
    fixups::assign_status(ctx.schema);

    if config.resolve_derived_types_and_groupings {
        log::debug!("phase: derived types");
        type_resolver::resolve_derived_types(&mut ctx);
        log::debug!("phase: uses");
        uses_resolver::resolve_uses(&mut ctx);
    }

    fixups::assign_effective_namespaces(ctx.schema);

    if config.resolve_augments {
        log::debug!("phase: augments");
        augment_resolver::resolve_augments(&mut ctx);
    }
    if config.resolve_deviations {
        log::debug!("phase: deviations");
        deviation_resolver::resolve_deviations(&mut ctx);
    }

    fixups::assign_status(ctx.schema);
    fixups::assign_config(ctx.schema);
    log::debug!(
        "resolution finished, {} finding(s) forwarded",
        ctx.reporter.forwarded()
    );
}

fn run_fixup(
    ctx: &mut ResolutionContext<'_>,
    label: &str,
    fixup: fn(&mut ResolutionContext<'_>) -> Result<(), errors::ResolveError>,
) {
    if let Err(err) = fixup(ctx) {
        log::warn!("{label}: fix-up stopped early: {err}");
    }
}

/// A resolved schema together with everything reported while resolving it.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSchema {
    pub schema: Schema,
    pub findings: Findings,
}

/// Marker state indicating the builder holds no resolved schema yet.
pub struct ResolverInitState;

/// Marker state indicating resolution is complete and the schema is ready.
pub struct ResolverCompleteState;

/// Type alias for a completed resolver builder ready to yield its schema.
pub type CompletedResolverBuilder = SchemaResolverBuilder<ResolverCompleteState>;

/// Builder for running resolution on a populated schema.
///
/// Uses the typestate pattern to ensure resolution completes before the
/// schema can be taken out.
pub struct SchemaResolverBuilder<S> {
    resolved: ResolvedSchema,
    _state: PhantomData<S>,
}

impl Default for SchemaResolverBuilder<ResolverInitState> {
    fn default() -> Self {
        SchemaResolverBuilder::new()
    }
}

impl SchemaResolverBuilder<ResolverInitState> {
    #[must_use]
    pub fn new() -> Self {
        SchemaResolverBuilder {
            resolved: ResolvedSchema::default(),
            _state: PhantomData,
        }
    }

    /// Resolve `schema` and return a completed builder.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema holds no modules.
    #[must_use = "returns builder with resolved schema, extract with .resolved_schema()"]
    pub fn build_resolved_schema(
        mut schema: Schema,
        config: &ResolverConfig,
    ) -> anyhow::Result<SchemaResolverBuilder<ResolverCompleteState>> {
        if schema.registry.is_empty() {
            anyhow::bail!("cannot resolve a schema without modules");
        }

        let mut findings = Findings::new();
        resolve_schema(&mut schema, config, &mut findings);

        Ok(SchemaResolverBuilder {
            resolved: ResolvedSchema { schema, findings },
            _state: PhantomData,
        })
    }
}

impl SchemaResolverBuilder<ResolverCompleteState> {
    /// Consume the builder and return the resolved schema with its findings.
    #[must_use = "consumes builder and returns the resolved schema"]
    pub fn resolved_schema(self) -> ResolvedSchema {
        self.resolved
    }
}
