use async_trait::async_trait;
use awful_aj::{api::ask, config::AwfulJadeConfig, template::ChatTemplate};
use tracing::{debug, info};

use crate::error::ReasoningError;
use crate::prompts::ReasoningRequest;

/// External judgment over a composed request. Returns the raw response text; validation
/// happens in `verdict`.
#[async_trait(?Send)]
pub trait ReasoningService {
    async fn judge(&self, request: &ReasoningRequest) -> Result<String, ReasoningError>;
}

/// OpenAI-compatible chat endpoint configured through awful_aj.
pub struct AwfulJadeReasoner {
    cfg: AwfulJadeConfig,
    tpl: ChatTemplate,
}

impl AwfulJadeReasoner {
    pub fn new(cfg: AwfulJadeConfig, tpl: ChatTemplate) -> Self {
        Self { cfg, tpl }
    }
}

#[async_trait(?Send)]
impl ReasoningService for AwfulJadeReasoner {
    async fn judge(&self, request: &ReasoningRequest) -> Result<String, ReasoningError> {
        let start = std::time::Instant::now();

        debug!(
            "LLM call starting - prompt_length={} chars, evidence={}",
            request.prompt.len(),
            request.evidence_count
        );

        // Map Box<dyn StdError> before it crosses an await point
        let answer = ask(&self.cfg, request.prompt.clone(), &self.tpl, None, None, false)
            .await
            .map_err(|e| ReasoningError::Backend(e.to_string()))?;

        let elapsed = start.elapsed();
        info!(
            "LLM API call completed - duration={:.2}s, response_length={} chars",
            elapsed.as_secs_f32(),
            answer.len()
        );

        if answer.trim().is_empty() {
            return Err(ReasoningError::EmptyResponse);
        }
        Ok(answer)
    }
}
