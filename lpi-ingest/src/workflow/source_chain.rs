//! Profile Source Chain
//!
//! Runs the strategies strictly in order against one access token, gating
//! each on the observations gathered so far. A strategy failure is recorded
//! in the report and the chain moves on; nothing a strategy does can discard
//! what earlier strategies already found.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::types::{
    AccessToken, FieldName, ObservationSet, ProfileStrategy, SourceId, StrategyError,
};
use crate::utils::{Classify, FailureClass};

/// One strategy that ran and contributed nothing because it failed
#[derive(Debug, Clone, Serialize)]
pub struct SourceFailure {
    pub strategy: &'static str,
    pub source: SourceId,
    /// Upstream HTTP status, when the failure came with one
    pub status: Option<u16>,
    /// Upstream failure class; `None` for parse and missing-input failures
    pub class: Option<FailureClass>,
    pub message: String,
}

impl SourceFailure {
    fn from_error(strategy: &dyn ProfileStrategy, error: &StrategyError) -> Self {
        let upstream = match error {
            StrategyError::Upstream(e) => Some(e),
            StrategyError::Exhausted { last, .. } => Some(last),
            StrategyError::Parse(_) | StrategyError::MissingInput(_) => None,
        };

        Self {
            strategy: strategy.name(),
            source: strategy.source(),
            status: upstream.and_then(|e| e.status),
            class: upstream.map(|e| e.failure_class()),
            message: error.to_string(),
        }
    }
}

/// Everything one chain run produced
#[derive(Debug, Default)]
pub struct ChainReport {
    pub observations: ObservationSet,
    pub failures: Vec<SourceFailure>,
    /// Names of strategies whose gate passed, in run order
    pub attempted: Vec<&'static str>,
    /// Names of strategies whose gate rejected the run
    pub skipped: Vec<&'static str>,
}

impl ChainReport {
    /// The identity id was observed by some strategy
    pub fn has_identity(&self) -> bool {
        self.observations.has(FieldName::IdentityId)
    }

    pub fn was_attempted(&self, strategy: &str) -> bool {
        self.attempted.iter().any(|s| *s == strategy)
    }

    /// Failure shared by every attempted strategy
    ///
    /// Returns the shared class and the first failure when every attempted
    /// strategy failed upstream with the same class. Permanent failures only
    /// qualify when each one is a 401/403. Mixed causes, or any strategy that
    /// answered, yield `None`.
    pub fn uniform_upstream_failure(&self) -> Option<(FailureClass, &SourceFailure)> {
        let first = self.failures.first()?;
        if self.failures.len() != self.attempted.len() {
            return None;
        }

        let class = first.class?;
        let uniform = self.failures.iter().all(|f| {
            f.class == Some(class)
                && (class != FailureClass::Permanent || matches!(f.status, Some(401) | Some(403)))
        });

        uniform.then_some((class, first))
    }

    /// Strategy names that failed, for the audit trail
    pub fn failed_sources(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.strategy.to_string()).collect()
    }
}

/// Ordered list of profile strategies
pub struct ProfileSourceChain {
    strategies: Vec<Box<dyn ProfileStrategy>>,
}

impl ProfileSourceChain {
    pub fn new(strategies: Vec<Box<dyn ProfileStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Run every strategy whose gate passes
    pub async fn run(&self, token: &AccessToken) -> ChainReport {
        let mut report = ChainReport::default();

        for strategy in &self.strategies {
            let name = strategy.name();

            if !strategy.should_attempt(&report.observations) {
                debug!(strategy = name, "Strategy skipped by gate");
                report.skipped.push(name);
                continue;
            }

            report.attempted.push(name);

            match strategy.fetch(token, &report.observations).await {
                Ok(observations) => {
                    info!(
                        strategy = name,
                        observations = observations.len(),
                        "Strategy completed"
                    );
                    report.observations.extend(observations);
                }
                Err(error) => {
                    let failure = SourceFailure::from_error(strategy.as_ref(), &error);
                    warn!(
                        strategy = name,
                        source = %failure.source,
                        status = ?failure.status,
                        error = %error,
                        "Strategy failed, continuing with remaining sources"
                    );
                    report.failures.push(failure);
                }
            }
        }

        info!(
            attempted = report.attempted.len(),
            failed = report.failures.len(),
            observations = report.observations.len(),
            "Source chain finished"
        );

        report
    }
}
