use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::similarity::word_set;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Election,
    Economy,
    Crypto,
    Politics,
    Technology,
    Climate,
    Health,
    Finance,
    General,
}

impl Topic {
    /// Topics that switch on the financial-only adapters.
    pub fn is_financial(&self) -> bool {
        matches!(self, Self::Finance | Self::Crypto)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Election => "election",
            Self::Economy => "economy",
            Self::Crypto => "crypto",
            Self::Politics => "politics",
            Self::Technology => "technology",
            Self::Climate => "climate",
            Self::Health => "health",
            Self::Finance => "finance",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct TopicKeywords {
    topic: Topic,
    triggers: &'static [&'static str],
    augment: &'static [&'static str],
}

// Priority order: the first topic with a matching trigger wins.
static TOPIC_TABLE: &[TopicKeywords] = &[
    TopicKeywords {
        topic: Topic::Election,
        triggers: &[
            "election", "elections", "poll", "polls", "vote", "voting", "ballot", "candidate",
            "electoral", "primary", "midterm", "midterms", "nominee", "caucus",
        ],
        augment: &["poll", "vote", "candidate", "campaign"],
    },
    TopicKeywords {
        topic: Topic::Economy,
        triggers: &[
            "economy", "economic", "gdp", "inflation", "recession", "unemployment", "cpi", "fed",
            "federal reserve", "interest rate", "interest rates", "jobs report",
        ],
        augment: &["gdp", "inflation", "recession", "employment"],
    },
    TopicKeywords {
        topic: Topic::Crypto,
        triggers: &[
            "crypto", "cryptocurrency", "bitcoin", "btc", "ethereum", "eth", "blockchain", "defi",
            "nft", "solana", "stablecoin",
        ],
        augment: &["blockchain", "bitcoin", "cryptocurrency"],
    },
    TopicKeywords {
        topic: Topic::Politics,
        triggers: &[
            "politics", "political", "policy", "legislation", "congress", "senate",
            "government", "law", "president", "parliament", "supreme court",
        ],
        augment: &["policy", "legislation", "congress"],
    },
    TopicKeywords {
        topic: Topic::Technology,
        triggers: &[
            "tech", "technology", "ai", "software", "hardware", "startup", "semiconductor",
            "chip", "chips", "artificial intelligence",
        ],
        augment: &["ai", "software", "innovation"],
    },
    TopicKeywords {
        topic: Topic::Climate,
        triggers: &[
            "climate", "temperature", "carbon", "emissions", "renewable", "warming",
            "sustainability",
        ],
        augment: &["temperature", "carbon", "emissions"],
    },
    TopicKeywords {
        topic: Topic::Health,
        triggers: &[
            "health", "disease", "vaccine", "pandemic", "treatment", "medical", "healthcare",
            "outbreak", "fda",
        ],
        augment: &["disease", "vaccine", "treatment"],
    },
    TopicKeywords {
        topic: Topic::Finance,
        triggers: &[
            "stock", "stocks", "shares", "earnings", "ipo", "nasdaq", "dow", "dividend",
            "invest", "investing", "trading", "s&p", "market cap",
        ],
        augment: &["stock", "earnings", "market"],
    },
];

static TICKER_TABLE: &[(&str, &str)] = &[
    ("bitcoin", "BTC-USD"),
    ("btc", "BTC-USD"),
    ("ethereum", "ETH-USD"),
    ("eth", "ETH-USD"),
    ("tesla", "TSLA"),
    ("apple", "AAPL"),
    ("google", "GOOGL"),
    ("microsoft", "MSFT"),
    ("amazon", "AMZN"),
    ("meta", "META"),
    ("nvidia", "NVDA"),
    ("spy", "SPY"),
    ("s&p", "SPY"),
    ("dow", "DIA"),
    ("nasdaq", "QQQ"),
];

static CASHTAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$([A-Za-z]{1,5})\b").expect("cashtag pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancedQuery {
    pub original: String,
    pub enhanced: String,
    pub topic: Topic,
    pub tickers: Vec<String>,
}

fn keyword_matches(keyword: &str, lowered: &str, tokens: &BTreeSet<String>) -> bool {
    if keyword.chars().all(char::is_alphanumeric) {
        tokens.contains(keyword)
    } else {
        // phrases and symbols ("s&p") match as substrings
        lowered.contains(keyword)
    }
}

pub fn detect_topic(query: &str) -> Topic {
    let lowered = query.to_lowercase();
    let tokens = word_set(&lowered);
    TOPIC_TABLE
        .iter()
        .find(|entry| {
            entry
                .triggers
                .iter()
                .any(|kw| keyword_matches(kw, &lowered, &tokens))
        })
        .map(|entry| entry.topic)
        .unwrap_or(Topic::General)
}

/// Ticker hints for financial adapters: table lookups first, then explicit `$CASHTAG`s.
pub fn extract_tickers(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    let tokens = word_set(&lowered);

    let mut out: Vec<String> = Vec::new();
    let mut push = |t: String| {
        if !out.contains(&t) {
            out.push(t);
        }
    };

    for (keyword, ticker) in TICKER_TABLE {
        if keyword_matches(keyword, &lowered, &tokens) {
            push(ticker.to_string());
        }
    }
    for cap in CASHTAG.captures_iter(query) {
        push(cap[1].to_uppercase());
    }
    out
}

/// Classify the query and append the topic's augment terms that are not already present.
/// Re-enhancing the output adds nothing.
pub fn enhance_query(query: &str) -> EnhancedQuery {
    let original = query.trim().to_string();
    let topic = detect_topic(&original);
    let tickers = extract_tickers(&original);

    let mut enhanced = original.clone();
    if let Some(entry) = TOPIC_TABLE.iter().find(|e| e.topic == topic) {
        let present = word_set(&original.to_lowercase());
        for term in entry.augment {
            if !present.contains(*term) {
                enhanced.push(' ');
                enhanced.push_str(term);
            }
        }
    }

    EnhancedQuery {
        original,
        enhanced,
        topic,
        tickers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_topics_in_priority_order() {
        assert_eq!(detect_topic("Who will win the 2028 election?"), Topic::Election);
        assert_eq!(detect_topic("Will inflation fall below 2%?"), Topic::Economy);
        assert_eq!(detect_topic("Will Bitcoin reach $150k"), Topic::Crypto);
        assert_eq!(detect_topic("Will the Senate pass the bill"), Topic::Politics);
        assert_eq!(detect_topic("Will AI replace radiologists"), Topic::Technology);
        assert_eq!(detect_topic("Will Tesla stock hit 500"), Topic::Finance);
        assert_eq!(detect_topic("Will it rain in Paris tomorrow"), Topic::General);
        // election outranks politics
        assert_eq!(detect_topic("Will the president win the vote"), Topic::Election);
    }

    #[test]
    fn test_single_words_match_whole_tokens_only() {
        // "ai" inside "said" / "paid" must not trigger technology
        assert_eq!(detect_topic("He said the debt was paid"), Topic::General);
    }

    #[test]
    fn test_enhance_appends_missing_terms() {
        let q = enhance_query("Will the vote be close");
        assert_eq!(q.topic, Topic::Election);
        assert_eq!(q.enhanced, "Will the vote be close poll candidate campaign");
    }

    #[test]
    fn test_enhance_is_idempotent() {
        let once = enhance_query("Will Bitcoin reach 200k by 2027");
        let twice = enhance_query(&once.enhanced);
        assert_eq!(once.enhanced, twice.enhanced);
        assert_eq!(once.topic, twice.topic);
    }

    #[test]
    fn test_general_query_unchanged() {
        let q = enhance_query("  Will it snow in Oslo  ");
        assert_eq!(q.topic, Topic::General);
        assert_eq!(q.enhanced, "Will it snow in Oslo");
    }

    #[test]
    fn test_extract_tickers() {
        assert_eq!(
            extract_tickers("Will Tesla beat $aapl and the S&P this year"),
            vec!["TSLA", "SPY", "AAPL"]
        );
        assert!(extract_tickers("Will AI win the US election").is_empty());
    }

    #[test]
    fn test_financial_topics() {
        assert!(Topic::Finance.is_financial());
        assert!(Topic::Crypto.is_financial());
        assert!(!Topic::Economy.is_financial());
    }
}
