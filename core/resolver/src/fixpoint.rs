//! Bounded retry of resolution passes whose candidates may depend on each
//! other in an unknown order.

use yangkit_schema::statement::StatementId;

use crate::{context::ResolutionContext, errors::ResolveError};

/// What happened to one candidate in one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The candidate was rewritten and will not show up again.
    Resolved,
    /// The candidate depends on something that has not been resolved yet.
    Deferred,
    /// The candidate can never resolve; it has been marked and reported.
    Failed,
}

impl Outcome {
    #[must_use]
    pub fn made_progress(self) -> bool {
        !matches!(self, Outcome::Deferred)
    }
}

/// A retryable resolution pass.
pub trait FixpointPass {
    /// Statements still waiting to be resolved, re-collected every iteration.
    fn candidates(&self, ctx: &ResolutionContext<'_>) -> Vec<StatementId>;

    /// # Errors
    ///
    /// Returns an error on unexpected tree state; the loop logs it and moves on
    /// to the next candidate.
    fn attempt(
        &mut self,
        ctx: &mut ResolutionContext<'_>,
        candidate: StatementId,
    ) -> Result<Outcome, ResolveError>;
}

/// Which of the candidates still pending at the depth threshold get flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthReport {
    FirstOnly,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FixpointReport {
    pub iterations: usize,
    /// Candidates still pending once the depth threshold was crossed.
    pub too_deep: Vec<StatementId>,
    /// Candidates still pending when the loop stopped.
    pub leftovers: Vec<StatementId>,
}

pub struct FixpointLoop {
    pub label: &'static str,
    pub max_iterations: usize,
    /// Iteration after which pending candidates count as too deeply nested;
    /// 0 disables the check.
    pub depth_threshold: usize,
    pub depth_report: DepthReport,
}

impl FixpointLoop {
    /// Runs `pass` until an iteration makes no progress or the bound is hit.
    pub fn run(&self, ctx: &mut ResolutionContext<'_>, pass: &mut impl FixpointPass) -> FixpointReport {
        let mut report = FixpointReport::default();
        let mut progressed = true;

        while progressed && report.iterations < self.max_iterations {
            progressed = false;
            report.iterations += 1;

            let candidates = pass.candidates(ctx);
            log::debug!(
                "{}: iteration {} with {} candidate(s)",
                self.label,
                report.iterations,
                candidates.len()
            );
            for candidate in candidates {
                if !ctx.schema.arena.contains(candidate) {
                    continue;
                }
                match pass.attempt(ctx, candidate) {
                    Ok(outcome) => progressed |= outcome.made_progress(),
                    Err(err) => {
                        log::warn!("{}: skipping {candidate} in this iteration: {err}", self.label);
                    }
                }
            }

            if self.depth_threshold > 0 && report.iterations == self.depth_threshold {
                let pending = pass.candidates(ctx);
                report.too_deep = match self.depth_report {
                    DepthReport::FirstOnly => pending.into_iter().take(1).collect(),
                    DepthReport::All => pending,
                };
            }
        }

        report.leftovers = pass.candidates(ctx);
        log::debug!(
            "{}: finished after {} iteration(s), {} left unresolved",
            self.label,
            report.iterations,
            report.leftovers.len()
        );
        report
    }
}
