use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// One step of a banded score: any value `>= at_least` earns `points`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub at_least: f32,
    pub points: u8,
}

const fn band(at_least: f32, points: u8) -> Band {
    Band { at_least, points }
}

/// Point bands for the data-quality baseline. Thresholds are empirical, not calibrated.
/// Each list is ordered from the highest threshold down; the first match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineBands {
    pub quantity: Vec<Band>,
    pub diversity: Vec<Band>,
    pub quality: Vec<Band>,
}

impl Default for BaselineBands {
    fn default() -> Self {
        Self {
            quantity: vec![band(10.0, 10), band(7.0, 7), band(4.0, 4), band(1.0, 2)],
            diversity: vec![band(4.0, 10), band(3.0, 7), band(2.0, 4), band(1.0, 1)],
            quality: vec![band(80.0, 10), band(65.0, 7), band(50.0, 4), band(0.0, 2)],
        }
    }
}

impl BaselineBands {
    pub const COMPONENT_MAX: u8 = 10;

    fn validate(&self, errors: &mut Vec<String>) {
        for (name, bands) in [
            ("quantity", &self.quantity),
            ("diversity", &self.diversity),
            ("quality", &self.quality),
        ] {
            if bands.iter().any(|b| b.points > Self::COMPONENT_MAX) {
                errors.push(format!(
                    "bands.{name}: points must not exceed {}",
                    Self::COMPONENT_MAX
                ));
            }
            if bands.windows(2).any(|w| w[0].at_least < w[1].at_least) {
                errors.push(format!("bands.{name}: thresholds must be in descending order"));
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum size of the ranked evidence set.
    pub evidence_cap: usize,
    /// Evidence items embedded in the reasoning request.
    pub request_evidence_cap: usize,
    /// Records asked of each adapter.
    pub per_adapter_limit: usize,
    pub adapter_timeout_secs: u64,
    pub reasoning_timeout_secs: u64,
    /// Outer deadline for the whole query; expiry cancels everything in flight.
    pub query_deadline_secs: u64,
    pub min_title_chars: usize,
    /// Longest query text embedded in the reasoning request.
    pub max_query_chars: usize,
    pub snippet_chars: usize,
    /// Approximate token ceiling for the reasoning request payload.
    pub request_token_budget: usize,
    /// Evidence items kept on the returned verdict for display.
    pub display_evidence: usize,
    pub bands: BaselineBands,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            evidence_cap: 15,
            request_evidence_cap: 12,
            per_adapter_limit: 10,
            adapter_timeout_secs: 15,
            reasoning_timeout_secs: 60,
            query_deadline_secs: 120,
            min_title_chars: 15,
            max_query_chars: 500,
            snippet_chars: 200,
            request_token_budget: 6000,
            display_evidence: 10,
            bands: BaselineBands::default(),
        }
    }
}

impl EngineConfig {
    pub const MAX_SNIPPET_CHARS: usize = 200;
    /// Smallest budget that still fits the prompt frame, a cut query and one item.
    pub const MIN_REQUEST_TOKENS: usize = 750;

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.evidence_cap == 0 {
            errors.push("evidence_cap must be greater than 0".to_string());
        }
        if self.request_evidence_cap == 0 {
            errors.push("request_evidence_cap must be greater than 0".to_string());
        }
        if self.request_evidence_cap > self.evidence_cap {
            errors.push("request_evidence_cap must not exceed evidence_cap".to_string());
        }
        if self.per_adapter_limit == 0 {
            errors.push("per_adapter_limit must be greater than 0".to_string());
        }
        if self.adapter_timeout_secs == 0
            || self.reasoning_timeout_secs == 0
            || self.query_deadline_secs == 0
        {
            errors.push("timeouts must be greater than 0".to_string());
        }
        if self.snippet_chars == 0 || self.snippet_chars > Self::MAX_SNIPPET_CHARS {
            errors.push(format!(
                "snippet_chars must be between 1 and {}",
                Self::MAX_SNIPPET_CHARS
            ));
        }
        if self.max_query_chars == 0 {
            errors.push("max_query_chars must be greater than 0".to_string());
        }
        if self.request_token_budget < Self::MIN_REQUEST_TOKENS {
            errors.push(format!(
                "request_token_budget must be at least {}",
                Self::MIN_REQUEST_TOKENS
            ));
        }
        self.bands.validate(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.adapter_timeout_secs)
    }

    pub fn reasoning_timeout(&self) -> Duration {
        Duration::from_secs(self.reasoning_timeout_secs)
    }

    pub fn query_deadline(&self) -> Duration {
        Duration::from_secs(self.query_deadline_secs)
    }
}
