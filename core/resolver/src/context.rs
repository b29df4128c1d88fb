use yangkit_schema::{
    Schema,
    findings::{FindingKind, FindingSink},
    statement::StatementId,
};

use crate::{config::ResolverConfig, reporter::Reporter};

/// Everything a resolver pass needs: the schema it rewrites, where its
/// findings go, and the execution flags.
pub struct ResolutionContext<'a> {
    pub schema: &'a mut Schema,
    pub reporter: Reporter<'a>,
    pub config: &'a ResolverConfig,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(
        schema: &'a mut Schema,
        config: &'a ResolverConfig,
        sink: &'a mut dyn FindingSink,
    ) -> Self {
        Self {
            schema,
            reporter: Reporter::new(sink, config),
            config,
        }
    }

    pub fn report(&mut self, statement: StatementId, kind: FindingKind, message: impl Into<String>) {
        self.reporter.report(self.schema, statement, kind, message);
    }
}
