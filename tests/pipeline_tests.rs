use async_trait::async_trait;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use awful_forecast::models::PredictionRecord;
use awful_forecast::persist::VerdictSink;
use awful_forecast::query::Topic;
use awful_forecast::verdict::{final_confidence, PARSE_FAILURE_CAVEAT};
use awful_forecast::{
    Activation, AdapterError, Aggregator, DirectionalLabel, EngineConfig, FetchRequest, Pipeline,
    PredictError, RawEvidence, ReasoningError, ReasoningRequest, ReasoningService, SourceAdapter,
};

struct FakeAdapter {
    name: &'static str,
    records: Vec<RawEvidence>,
    activation: Activation,
    delay: Option<Duration>,
    fail: bool,
    calls: Arc<AtomicUsize>,
    seen_tickers: Arc<Mutex<Vec<String>>>,
    seen_topics: Arc<Mutex<Vec<Topic>>>,
}

impl FakeAdapter {
    fn new(name: &'static str, titles: &[&str]) -> Self {
        Self {
            name,
            records: titles.iter().map(|t| RawEvidence::new(name, *t)).collect(),
            activation: Activation::Always,
            delay: None,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
            seen_tickers: Arc::new(Mutex::new(Vec::new())),
            seen_topics: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn financial(mut self) -> Self {
        self.activation = Activation::FinancialOnly;
        self
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl SourceAdapter for FakeAdapter {
    fn name(&self) -> &str {
        self.name
    }

    fn activation(&self) -> Activation {
        self.activation
    }

    async fn fetch(&self, req: &FetchRequest<'_>) -> Result<Vec<RawEvidence>, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_tickers
            .lock()
            .unwrap()
            .extend(req.tickers.iter().cloned());
        self.seen_topics.lock().unwrap().push(req.topic);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if self.fail {
            return Err(AdapterError::Decode("provider exploded".into()));
        }
        Ok(self.records.iter().take(req.limit).cloned().collect())
    }
}

#[derive(Clone)]
struct ScriptedReasoner {
    response: String,
    delay: Option<Duration>,
    fail: bool,
    requests: Rc<RefCell<Vec<ReasoningRequest>>>,
}

impl ScriptedReasoner {
    fn answering(response: &str) -> Self {
        Self {
            response: response.to_string(),
            delay: None,
            fail: false,
            requests: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

#[async_trait(?Send)]
impl ReasoningService for ScriptedReasoner {
    async fn judge(&self, request: &ReasoningRequest) -> Result<String, ReasoningError> {
        self.requests.borrow_mut().push(request.clone());
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if self.fail {
            return Err(ReasoningError::Backend("503 Service Unavailable".into()));
        }
        Ok(self.response.clone())
    }
}

#[derive(Clone, Default)]
struct MemorySink {
    records: Rc<RefCell<Vec<PredictionRecord>>>,
}

impl VerdictSink for MemorySink {
    fn record(&self, record: &PredictionRecord) -> anyhow::Result<std::path::PathBuf> {
        self.records.borrow_mut().push(record.clone());
        Ok(std::path::PathBuf::from("memory"))
    }
}

const STRONG_YES: &str = r#"{"verdict": "YES - every outlet reports the votes are there",
    "key_factors": ["[1] whip count", "[2] leadership statement"],
    "caveats": ["procedural delays"], "evidence_strength": 20}"#;

fn pipeline(adapters: Vec<FakeAdapter>, reasoner: ScriptedReasoner, config: EngineConfig) -> Pipeline {
    let adapters: Vec<Arc<dyn SourceAdapter>> = adapters
        .into_iter()
        .map(|a| Arc::new(a) as Arc<dyn SourceAdapter>)
        .collect();
    Pipeline::new(Aggregator::new(adapters, &config), Box::new(reasoner), config)
}

#[tokio::test]
async fn test_end_to_end_verdict() {
    let news = FakeAdapter::new(
        "Reuters",
        &["Senate budget bill passes key procedural vote", "Budget bill heads for final Senate vote"],
    );
    let forum = FakeAdapter::new("Reddit", &["Discussion: will the budget bill pass the Senate?"]);
    let reasoner = ScriptedReasoner::answering(STRONG_YES);
    let requests = reasoner.requests.clone();
    let sink = MemorySink::default();
    let stored = sink.records.clone();

    let p = pipeline(vec![news, forum], reasoner, EngineConfig::default())
        .with_sink(Box::new(sink));
    let v = p.predict("Will the budget bill pass the Senate?").await.unwrap();

    assert_eq!(v.label, DirectionalLabel::Yes);
    assert_eq!(v.data_quality.source_count, 3);
    assert_eq!(v.data_quality.platforms_used, 2);
    assert_eq!(v.confidence_score, final_confidence(v.data_quality.confidence_boost, 20));
    assert!(v.confidence_score <= 100);
    assert_eq!(v.key_factors.len(), 2);
    assert_eq!(v.caveats, vec!["procedural delays"]);

    // evidence is ranked by quality
    let qualities: Vec<u8> = v.evidence.iter().map(|e| e.quality_score).collect();
    assert!(qualities.windows(2).all(|w| w[0] >= w[1]));

    let requests = requests.borrow();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].evidence_count, 3);
    assert!(requests[0].prompt.contains("Will the budget bill pass the Senate?"));
    assert!(requests[0].prompt.contains("| Sentiment: "));

    let stored = stored.borrow();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].evidence.len(), 3);
    assert_eq!(stored[0].verdict, v);
}

#[tokio::test(start_paused = true)]
async fn test_all_adapters_time_out_is_empty_evidence() {
    let slow_a = FakeAdapter::new("A", &["A headline that is long enough"]).delayed(Duration::from_secs(3600));
    let slow_b = FakeAdapter::new("B", &["B headline that is long enough"]).delayed(Duration::from_secs(3600));
    let reasoner = ScriptedReasoner::answering(STRONG_YES);
    let requests = reasoner.requests.clone();

    let p = pipeline(vec![slow_a, slow_b], reasoner, EngineConfig::default());
    let err = p.predict("Will the budget bill pass?").await.unwrap_err();

    assert!(matches!(err, PredictError::EmptyEvidence { .. }), "{err}");
    assert!(err.is_user_facing());
    assert!(err.to_string().contains("broadening"));
    assert!(requests.borrow().is_empty(), "no judgment once evidence is empty");
}

#[tokio::test(start_paused = true)]
async fn test_one_failing_adapter_does_not_block_others() {
    let broken = FakeAdapter::new("Broken", &["Never returned headline text"]).failing();
    let slow = FakeAdapter::new("Slow", &["Never returned either, too slow"]).delayed(Duration::from_secs(3600));
    let good = FakeAdapter::new("Good", &["Inflation cools for a third month"]);
    let p = pipeline(vec![broken, slow, good], ScriptedReasoner::answering("LIKELY"), EngineConfig::default());

    let v = p.predict("Will inflation cool further?").await.unwrap();
    assert_eq!(v.data_quality.source_count, 1);
    assert_eq!(v.data_quality.platform_breakdown.get("Good"), Some(&1));
    assert_eq!(v.label, DirectionalLabel::Likely);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_titles_first_registered_wins() {
    // the first adapter answers last; registration order still decides
    let first = FakeAdapter::new("First", &["Fed Holds Rates Steady In March"]).delayed(Duration::from_secs(5));
    let second = FakeAdapter::new("Second", &["  fed holds rates   steady in march"]);
    let sink = MemorySink::default();
    let stored = sink.records.clone();

    let p = pipeline(vec![first, second], ScriptedReasoner::answering("NO"), EngineConfig::default())
        .with_sink(Box::new(sink));
    let v = p.predict("Will the Fed cut rates in March?").await.unwrap();

    assert_eq!(v.evidence.len(), 1);
    assert_eq!(v.evidence[0].raw.provider, "First");
    assert_eq!(stored.borrow()[0].evidence.len(), 1);
}

#[tokio::test]
async fn test_unparseable_judgment_is_undetermined() {
    let news = FakeAdapter::new("Reuters", &["Launch window opens next week for lander"]);
    let p = pipeline(vec![news], ScriptedReasoner::answering("MAYBE it could happen"), EngineConfig::default());

    let v = p.predict("Will the lander launch next week?").await.unwrap();
    assert_eq!(v.label, DirectionalLabel::Undetermined);
    assert_eq!(v.confidence_score, 50);
    assert!(v.caveats.iter().any(|c| c == PARSE_FAILURE_CAVEAT));
}

#[tokio::test]
async fn test_reasoning_failure_is_fatal() {
    let news = FakeAdapter::new("Reuters", &["Launch window opens next week for lander"]);
    let mut reasoner = ScriptedReasoner::answering("YES");
    reasoner.fail = true;
    let p = pipeline(vec![news], reasoner, EngineConfig::default());

    let err = p.predict("Will the lander launch?").await.unwrap_err();
    assert!(matches!(err, PredictError::Reasoning(_)), "{err}");
    assert!(!err.is_user_facing());
}

#[tokio::test(start_paused = true)]
async fn test_reasoning_timeout_is_fatal() {
    let news = FakeAdapter::new("Reuters", &["Launch window opens next week for lander"]);
    let mut reasoner = ScriptedReasoner::answering("YES");
    reasoner.delay = Some(Duration::from_secs(600));
    let p = pipeline(vec![news], reasoner, EngineConfig::default());

    let err = p.predict("Will the lander launch?").await.unwrap_err();
    assert!(matches!(err, PredictError::ReasoningTimeout(d) if d == Duration::from_secs(60)), "{err}");
}

#[tokio::test(start_paused = true)]
async fn test_outer_deadline_cancels_query() {
    let news = FakeAdapter::new("Reuters", &["Launch window opens next week for lander"]);
    let mut reasoner = ScriptedReasoner::answering("YES");
    reasoner.delay = Some(Duration::from_secs(600));
    let sink = MemorySink::default();
    let stored = sink.records.clone();
    let config = EngineConfig {
        query_deadline_secs: 30,
        reasoning_timeout_secs: 60,
        ..Default::default()
    };
    let p = pipeline(vec![news], reasoner, config).with_sink(Box::new(sink));

    let err = p.predict("Will the lander launch?").await.unwrap_err();
    assert!(matches!(err, PredictError::DeadlineExceeded(d) if d == Duration::from_secs(30)), "{err}");
    assert!(stored.borrow().is_empty(), "no partial verdict is recorded");
}

#[tokio::test]
async fn test_financial_adapters_only_for_financial_topics() {
    let general = FakeAdapter::new("News", &["Tesla shares climb after deliveries beat"]);
    let finance = FakeAdapter::new("Yahoo Finance", &["TSLA closes at record high on volume"]).financial();
    let finance_calls = finance.calls.clone();
    let tickers = finance.seen_tickers.clone();
    let topics = general.seen_topics.clone();
    let p = pipeline(vec![general, finance], ScriptedReasoner::answering("LIKELY"), EngineConfig::default());

    let v = p.predict("Will Tesla stock close above 500?").await.unwrap();
    assert_eq!(finance_calls.load(Ordering::SeqCst), 1);
    assert_eq!(*tickers.lock().unwrap(), vec!["TSLA".to_string()]);
    assert_eq!(*topics.lock().unwrap(), vec![Topic::Finance]);
    assert_eq!(v.data_quality.platforms_used, 2);

    let general = FakeAdapter::new("News", &["Storm system brings heavy rain to coast"]);
    let finance = FakeAdapter::new("Yahoo Finance", &["Unrelated market headline here"]).financial();
    let finance_calls = finance.calls.clone();
    let p = pipeline(vec![general, finance], ScriptedReasoner::answering("NO"), EngineConfig::default());

    p.predict("Will it rain in Lisbon on Friday?").await.unwrap();
    assert_eq!(finance_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_query_rejected() {
    let news = FakeAdapter::new("Reuters", &["Launch window opens next week for lander"]);
    let calls = news.calls.clone();
    let p = pipeline(vec![news], ScriptedReasoner::answering("YES"), EngineConfig::default());

    let err = p.predict("   ").await.unwrap_err();
    assert!(matches!(err, PredictError::EmptyQuery));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_evidence_cap_and_request_cap() {
    let titles: Vec<String> = (0..20).map(|i| format!("Budget bill coverage item number {i}")).collect();
    let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
    let mut news = FakeAdapter::new("Reuters", &refs);
    news.records.iter_mut().for_each(|r| r.body = "Senate budget bill vote".into());
    let reasoner = ScriptedReasoner::answering(STRONG_YES);
    let requests = reasoner.requests.clone();
    let config = EngineConfig {
        per_adapter_limit: 20,
        ..Default::default()
    };
    let sink = MemorySink::default();
    let stored = sink.records.clone();
    let p = pipeline(vec![news], reasoner, config).with_sink(Box::new(sink));

    let v = p.predict("Will the budget bill pass?").await.unwrap();
    assert_eq!(v.data_quality.source_count, 15);
    assert_eq!(v.evidence.len(), 10);
    assert_eq!(stored.borrow()[0].evidence.len(), 15);
    assert_eq!(requests.borrow()[0].evidence_count, 12);
}
