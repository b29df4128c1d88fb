use rustc_hash::FxHashSet;
use yangkit_schema::{
    Schema,
    findings::{Finding, FindingKind, FindingSink, Severity},
    registry::Conformance,
    statement::StatementId,
};

use crate::config::ResolverConfig;

/// Forwards findings to the caller's sink after applying the execution flags.
///
/// The same finding (statement, kind and message) is forwarded only once, so
/// resolvers can report from inside retried passes without flooding the sink.
pub struct Reporter<'a> {
    sink: &'a mut dyn FindingSink,
    fail_fast: bool,
    suppress_import_only: bool,
    halted: bool,
    reported_keys: FxHashSet<(StatementId, FindingKind, String)>,
    forwarded: usize,
}

impl<'a> Reporter<'a> {
    pub fn new(sink: &'a mut dyn FindingSink, config: &ResolverConfig) -> Self {
        Self {
            sink,
            fail_fast: config.fail_fast,
            suppress_import_only: config.suppress_findings_on_import_only_modules,
            halted: false,
            reported_keys: FxHashSet::default(),
            forwarded: 0,
        }
    }

    pub fn report(
        &mut self,
        schema: &Schema,
        statement: StatementId,
        kind: FindingKind,
        message: impl Into<String>,
    ) {
        if self.halted {
            return;
        }
        if self.suppress_import_only && Self::is_import_only(schema, statement) {
            return;
        }
        let message = message.into();
        if !self
            .reported_keys
            .insert((statement, kind, message.clone()))
        {
            return;
        }

        log::trace!("{} on {statement}: {message}", kind.code());
        self.sink.emit(Finding::new(statement, kind, message));
        self.forwarded += 1;

        if self.fail_fast && kind.severity() == Severity::Error {
            log::debug!("fail-fast: no further findings are forwarded");
            self.halted = true;
        }
    }

    /// Whether fail-fast has stopped forwarding.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    #[must_use]
    pub fn forwarded(&self) -> usize {
        self.forwarded
    }

    fn is_import_only(schema: &Schema, statement: StatementId) -> bool {
        schema
            .tree_module(statement)
            .and_then(|module| schema.registry.owning_module(module))
            .and_then(|module| schema.registry.get(module))
            .is_some_and(|info| info.conformance() == Conformance::ImportOnly)
    }
}
