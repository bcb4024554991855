//! Evidence aggregation and confidence composition for forecasting queries.
//!
//! A query is enhanced with topic keywords, fanned out to every applicable source adapter,
//! cleaned, scored, ranked and summarized into an objective data-quality boost. An external
//! reasoning service then judges the evidence, and its answer is validated and combined with
//! the boost into a bounded confidence and a forced directional verdict.

pub mod aggregate;
pub mod api_types;
pub mod budget;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod orchestrator;
pub mod out_models;
pub mod persist;
pub mod prompts;
pub mod query;
pub mod reasoning;
pub mod render;
pub mod reputation;
pub mod score;
pub mod select;
pub mod sentiment;
pub mod similarity;
pub mod verdict;

pub use aggregate::Aggregator;
pub use config::EngineConfig;
pub use error::{AdapterError, PredictError, ReasoningError};
pub use fetch::{Activation, FetchRequest, SourceAdapter};
pub use models::{DirectionalLabel, FinalVerdict, RawEvidence, Sentiment};
pub use orchestrator::Pipeline;
pub use prompts::ReasoningRequest;
pub use reasoning::ReasoningService;
