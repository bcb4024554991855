use chrono::Utc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::aggregate::Aggregator;
use crate::config::EngineConfig;
use crate::error::{PredictError, Result};
use crate::models::{FinalVerdict, PredictionRecord};
use crate::persist::VerdictSink;
use crate::prompts::compose_request;
use crate::query::enhance_query;
use crate::reasoning::ReasoningService;
use crate::score::score_all;
use crate::select::{data_quality, select_evidence};
use crate::verdict::{compose_verdict, parse_outcome};

/// Lifecycle of one query. Stages only move forward; `Errored` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Received,
    Enhancing,
    Aggregating,
    Scoring,
    Selecting,
    AwaitingJudgment,
    Composing,
    Complete,
    Errored,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Errored)
    }

    fn next(self) -> Option<Stage> {
        Some(match self {
            Self::Received => Self::Enhancing,
            Self::Enhancing => Self::Aggregating,
            Self::Aggregating => Self::Scoring,
            Self::Scoring => Self::Selecting,
            Self::Selecting => Self::AwaitingJudgment,
            Self::AwaitingJudgment => Self::Composing,
            Self::Composing => Self::Complete,
            Self::Complete | Self::Errored => return None,
        })
    }

    pub fn can_advance_to(self, to: Stage) -> bool {
        match to {
            // deadline expiry can interrupt any live stage
            Self::Errored => !self.is_terminal(),
            _ => self.next() == Some(to),
        }
    }
}

#[derive(Debug)]
struct Lifecycle {
    stage: Stage,
    entered: Instant,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            stage: Stage::Received,
            entered: Instant::now(),
        }
    }

    fn advance(&mut self, to: Stage) {
        debug_assert!(self.stage.can_advance_to(to), "{:?} -> {:?}", self.stage, to);
        debug!(
            "Stage {:?} -> {:?} - stage_duration={:.2}s",
            self.stage,
            to,
            self.entered.elapsed().as_secs_f32()
        );
        self.stage = to;
        self.entered = Instant::now();
    }

    fn fail(&mut self) {
        if !self.stage.is_terminal() {
            self.advance(Stage::Errored);
        }
    }
}

pub struct Pipeline {
    aggregator: Aggregator,
    reasoner: Box<dyn ReasoningService>,
    sink: Option<Box<dyn VerdictSink>>,
    config: EngineConfig,
}

impl Pipeline {
    pub fn new(aggregator: Aggregator, reasoner: Box<dyn ReasoningService>, config: EngineConfig) -> Self {
        Self {
            aggregator,
            reasoner,
            sink: None,
            config,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn VerdictSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Run one query end to end under the outer deadline. Either a complete verdict comes
    /// back or a typed error does; expiry drops every in-flight call.
    pub async fn predict(&self, query: &str) -> Result<FinalVerdict> {
        let pipeline_start = Instant::now();
        let deadline = self.config.query_deadline();
        info!("Pipeline started - query={:?}, deadline={}s", query, deadline.as_secs());

        let mut lifecycle = Lifecycle::new();
        let outcome = tokio::time::timeout(deadline, self.run_stages(query, &mut lifecycle)).await;

        let result = match outcome {
            Ok(Ok(verdict)) => Ok(verdict),
            Ok(Err(e)) => {
                lifecycle.fail();
                Err(e)
            }
            Err(_) => {
                lifecycle.fail();
                Err(PredictError::DeadlineExceeded(deadline))
            }
        };

        match &result {
            Ok(v) => info!(
                "Pipeline completed successfully - total_duration={:.2}s, label={}, confidence={}",
                pipeline_start.elapsed().as_secs_f32(),
                v.label,
                v.confidence_score
            ),
            Err(e) => error!(
                "Pipeline failed - total_duration={:.2}s, error={}",
                pipeline_start.elapsed().as_secs_f32(),
                e
            ),
        }
        result
    }

    async fn run_stages(&self, query: &str, lifecycle: &mut Lifecycle) -> Result<FinalVerdict> {
        let now = Utc::now();

        lifecycle.advance(Stage::Enhancing);
        let enhanced = enhance_query(query);
        if enhanced.original.is_empty() {
            return Err(PredictError::EmptyQuery);
        }
        info!(
            "Query enhanced - topic={}, tickers={:?}, enhanced={:?}",
            enhanced.topic, enhanced.tickers, enhanced.enhanced
        );

        lifecycle.advance(Stage::Aggregating);
        let records = self.aggregator.aggregate(&enhanced).await?;

        lifecycle.advance(Stage::Scoring);
        let scored = score_all(records, &enhanced.original, now);

        lifecycle.advance(Stage::Selecting);
        let evidence = select_evidence(scored, self.config.evidence_cap);
        let metrics = data_quality(&evidence, &self.config.bands);
        info!(
            "Evidence ranked - sources={}, platforms={}, avg_quality={:.1}, boost={}",
            metrics.source_count, metrics.platforms_used, metrics.avg_quality_score, metrics.confidence_boost
        );

        lifecycle.advance(Stage::AwaitingJudgment);
        let request = compose_request(&enhanced.original, &evidence, &metrics, &self.config)?;
        let budget = self.config.reasoning_timeout();
        let response = match tokio::time::timeout(budget, self.reasoner.judge(&request)).await {
            Ok(r) => r?,
            Err(_) => return Err(PredictError::ReasoningTimeout(budget)),
        };

        lifecycle.advance(Stage::Composing);
        let outcome = parse_outcome(&response, metrics.confidence_boost);
        let verdict = compose_verdict(outcome, metrics, &evidence, self.config.display_evidence);

        if let Some(sink) = &self.sink {
            let record = PredictionRecord {
                query: enhanced.original.clone(),
                enhanced_query: enhanced.enhanced.clone(),
                topic: enhanced.topic,
                created_at: now,
                evidence,
                verdict: verdict.clone(),
            };
            match sink.record(&record) {
                Ok(path) => debug!("Prediction persisted - path={}", path.display()),
                Err(e) => warn!("Failed to persist prediction - error={:#}", e),
            }
        }

        lifecycle.advance(Stage::Complete);
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stages_only_move_forward() {
        assert!(Stage::Received.can_advance_to(Stage::Enhancing));
        assert!(Stage::Composing.can_advance_to(Stage::Complete));
        assert!(!Stage::Scoring.can_advance_to(Stage::Aggregating));
        assert!(!Stage::Received.can_advance_to(Stage::Scoring));
        assert!(!Stage::Complete.can_advance_to(Stage::Enhancing));
    }

    #[test]
    fn test_errored_reachable_from_live_stages_only() {
        assert!(Stage::Aggregating.can_advance_to(Stage::Errored));
        assert!(Stage::AwaitingJudgment.can_advance_to(Stage::Errored));
        assert!(!Stage::Complete.can_advance_to(Stage::Errored));
        assert!(!Stage::Errored.can_advance_to(Stage::Errored));
    }

    #[test]
    fn test_lifecycle_walks_full_path() {
        let mut lc = Lifecycle::new();
        let mut stage = Stage::Received;
        while let Some(next) = stage.next() {
            lc.advance(next);
            stage = next;
        }
        assert_eq!(lc.stage, Stage::Complete);
        lc.fail();
        assert_eq!(lc.stage, Stage::Complete);
    }
}
