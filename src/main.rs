use anyhow::Result;
use awful_aj::{config, template};
use clap::Parser;
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info, warn};

use awful_forecast::fetch::{GoogleSearch, NewsApi, RedditSearch, YahooFinance};
use awful_forecast::persist::JsonFileSink;
use awful_forecast::reasoning::AwfulJadeReasoner;
use awful_forecast::render::render_verdict_markdown;
use awful_forecast::{Aggregator, EngineConfig, Pipeline, SourceAdapter};

/// Awful Forecast - evidence-backed verdicts for forecasting questions
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The question to forecast, e.g. "Will the Fed cut rates in March?"
    #[arg(required_unless_present_any = ["history", "show"])]
    query: Option<String>,

    /// Path to engine config (TOML); defaults are used when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Path to awful_aj LLM config (overrides AJ_CONFIG environment variable)
    #[arg(long)]
    llm_config: Option<String>,

    /// Chat template name for the judgment call
    #[arg(long, env = "AJ_TEMPLATE_PREDICT", default_value = "forecast_verdict")]
    template: String,

    /// Output directory for prediction records (default: "out")
    #[arg(short, long, default_value = "out")]
    output_dir: String,

    /// Print the verdict as JSON instead of Markdown
    #[arg(long)]
    json: bool,

    /// Do not write a prediction record
    #[arg(long)]
    no_persist: bool,

    /// List the N most recent stored predictions and exit
    #[arg(long, value_name = "N")]
    history: Option<usize>,

    /// Print one stored prediction by id and exit
    #[arg(long, value_name = "ID")]
    show: Option<String>,
}

/// Read-only history commands; true when one ran.
fn run_history(args: &Args) -> Result<bool> {
    let sink = JsonFileSink::new(&args.output_dir);

    if let Some(n) = args.history {
        let records = sink.recent(n)?;
        if records.is_empty() {
            println!("No stored predictions under {}", args.output_dir);
        }
        for r in &records {
            println!(
                "{}  {}  {:<13} {:>3}%  {}",
                JsonFileSink::record_id(r),
                r.created_at.format("%Y-%m-%d %H:%M"),
                r.verdict.label.as_str(),
                r.verdict.confidence_score,
                r.query
            );
        }
        return Ok(true);
    }

    if let Some(ref id) = args.show {
        let record = sink
            .load(id)?
            .ok_or_else(|| anyhow::anyhow!("no stored prediction with id {}", id))?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&record)?);
        } else {
            println!("{}", render_verdict_markdown(&record.query, &record.verdict));
        }
        return Ok(true);
    }

    Ok(false)
}

fn resolve_paths() -> Result<(std::path::PathBuf, std::path::PathBuf)> {
    // 1) Base config dir - prefer env override, else awful_aj::config_dir()
    let base_dir = if let Ok(dir) = std::env::var("AJ_CONFIG_DIR") {
        std::path::PathBuf::from(dir)
    } else {
        awful_aj::config_dir().map_err(|e| anyhow::anyhow!(e.to_string()))?
    };

    // 2) Config file - prefer AJ_CONFIG, else <base>/config.yaml
    let cfg_path = if let Ok(p) = std::env::var("AJ_CONFIG") {
        std::path::PathBuf::from(p)
    } else {
        base_dir.join("config.yaml")
    };

    // 3) Template dir - make it visible to the awful_aj template loader
    if std::env::var("AJ_TEMPLATE_DIR").is_err() {
        std::env::set_var("AJ_TEMPLATE_DIR", base_dir.join("templates"));
    }

    Ok((base_dir, cfg_path))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Register every adapter whose credentials are present.
fn build_adapters(client: &Client) -> Vec<Arc<dyn SourceAdapter>> {
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();

    match non_empty_env("NEWS_API_KEY") {
        Some(key) => adapters.push(Arc::new(NewsApi::new(client.clone(), key))),
        None => warn!("NewsAPI not configured (NEWS_API_KEY missing)"),
    }
    match (non_empty_env("GOOGLE_API_KEY"), non_empty_env("GOOGLE_CSE_ID")) {
        (Some(key), Some(cx)) => adapters.push(Arc::new(GoogleSearch::new(client.clone(), key, cx))),
        _ => warn!("Google Custom Search not configured (GOOGLE_API_KEY / GOOGLE_CSE_ID missing)"),
    }
    adapters.push(Arc::new(RedditSearch::new(client.clone())));
    adapters.push(Arc::new(YahooFinance::new(client.clone())));

    adapters
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    info!("Starting awful_forecast");

    let args = Args::parse();
    if run_history(&args)? {
        return Ok(());
    }
    let query = args
        .query
        .clone()
        .ok_or_else(|| anyhow::anyhow!("a query is required"))?;

    let engine_cfg = match args.config {
        Some(ref path) => {
            debug!("Loading engine config from: {}", path);
            EngineConfig::load(std::path::Path::new(path))?
        }
        None => EngineConfig::default(),
    };

    // LLM config path: CLI arg > resolve_paths logic
    let llm_cfg_path = if let Some(ref p) = args.llm_config {
        debug!("Using LLM config from --llm-config argument: {}", p);
        std::path::PathBuf::from(p)
    } else {
        let (_base_dir, cfg_path) = resolve_paths()?;
        debug!("Using LLM config from environment/default: {}", cfg_path.display());
        cfg_path
    };

    // Friendlier error if missing
    if !llm_cfg_path.exists() {
        return Err(anyhow::anyhow!(
            "awful_aj config not found at {}\n\
             Use --llm-config to specify a config file, or set AJ_CONFIG environment variable.\n\
             Example config.yaml:\n\
             api_key: \"YOUR_KEY\"\napi_base: \"http://localhost:5001/v1\"\nmodel: \"qwen3_30b_a3\"\n",
            llm_cfg_path.display()
        ));
    }

    let llm_cfg = config::load_config(
        llm_cfg_path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("invalid config path"))?,
    )
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let tpl = template::load_template(&args.template)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let reddit_agent = std::env::var("REDDIT_USER_AGENT")
        .unwrap_or_else(|_| format!("awful_forecast/{}", env!("CARGO_PKG_VERSION")));
    let client = Client::builder().user_agent(reddit_agent).build()?;

    let adapters = build_adapters(&client);
    let aggregator = Aggregator::new(adapters, &engine_cfg);
    info!("Adapters registered - {:?}", aggregator.adapter_names());

    let mut pipeline = Pipeline::new(
        aggregator,
        Box::new(AwfulJadeReasoner::new(llm_cfg, tpl)),
        engine_cfg,
    );
    if !args.no_persist {
        pipeline = pipeline.with_sink(Box::new(JsonFileSink::new(&args.output_dir)));
    }

    let verdict = pipeline.predict(&query).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        println!("{}", render_verdict_markdown(&query, &verdict));
    }
    Ok(())
}
