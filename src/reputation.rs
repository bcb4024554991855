use once_cell::sync::Lazy;

/// Static trust tier of a source: 1 is the most trusted, 4 is unrecognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tier(u8);

impl Tier {
    pub const WIRE: Tier = Tier(1);
    pub const MAINSTREAM: Tier = Tier(2);
    pub const COMMUNITY: Tier = Tier(3);
    pub const UNKNOWN: Tier = Tier(4);

    pub fn from_level(level: u8) -> Option<Tier> {
        (1..=4).contains(&level).then_some(Tier(level))
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    pub fn score(&self) -> u8 {
        match self.0 {
            1 => 100,
            2 => 80,
            3 => 60,
            _ => 40,
        }
    }

    pub fn badge(&self) -> &'static str {
        match self.0 {
            1 => "Highly Trusted",
            2 => "Trusted",
            3 => "Verify Claims",
            _ => "Unknown Source",
        }
    }
}

const TIER_1: &[&str] = &[
    // wire services and papers of record
    "Reuters", "Associated Press", "Bloomberg", "The Wall Street Journal",
    "The New York Times", "The Washington Post", "NPR", "PBS NewsHour", "ProPublica",
    "The Atlantic", "Foreign Policy",
    // international
    "BBC", "The Guardian", "Financial Times", "The Economist", "Al Jazeera English",
    "Deutsche Welle", "France 24",
    // business
    "CNBC", "MarketWatch", "Barron's", "Forbes", "Fortune", "Business Insider",
    "Seeking Alpha",
    // tech
    "TechCrunch", "The Verge", "Ars Technica", "Wired",
    // science
    "Nature", "Scientific American", "MIT Technology Review", "The Conversation",
    // fact-checking
    "PolitiFact", "FactCheck.org", "Snopes", "AP Fact Check",
    // domains seen from search adapters
    "reuters.com", "apnews.com", "bloomberg.com", "wsj.com", "nytimes.com",
    "washingtonpost.com", "pbs.org", "propublica.org", "theatlantic.com", "foreignpolicy.com",
    "theguardian.com", "ft.com", "economist.com", "aljazeera.com", "dw.com", "france24.com",
    "barrons.com", "businessinsider.com", "seekingalpha.com", "theverge.com",
    "arstechnica.com", "scientificamerican.com", "technologyreview.com",
    "theconversation.com",
];

const TIER_2: &[&str] = &[
    "USA Today", "TIME", "Newsweek", "Axios", "Vox", "Politico", "The Hill", "CBS News",
    "NBC News", "ABC News", "CNN", "Fox News", "The Independent", "Yahoo Finance",
    "Investopedia", "CoinDesk", "CoinTelegraph", "ZDNet", "CNET", "Engadget", "Mashable",
    "usatoday.com", "time.com", "axios.com", "politico.com", "thehill.com", "cbsnews.com",
    "nbcnews.com", "abcnews.go.com", "foxnews.com", "independent.co.uk", "finance.yahoo.com",
];

const TIER_3: &[&str] = &[
    "Medium", "Substack", "Twitter", "Reddit", "Quora", "BuzzFeed", "HuffPost", "Slate",
    "Salon",
];

static TIERS: Lazy<Vec<(Tier, Vec<String>)>> = Lazy::new(|| {
    [(Tier::WIRE, TIER_1), (Tier::MAINSTREAM, TIER_2), (Tier::COMMUNITY, TIER_3)]
        .into_iter()
        .map(|(tier, names)| (tier, names.iter().map(|n| n.to_lowercase()).collect()))
        .collect()
});

static BLACKLISTED_DOMAINS: &[&str] = &["example-fake-news.com", "clickbait-site.com"];

static SPAM_PHRASES: &[&str] = &[
    "click here",
    "you won't believe",
    "shocking",
    "doctors hate",
    "one weird trick",
    "make money fast",
    "get rich quick",
    "miracle cure",
    "lose weight fast",
    "secret revealed",
];

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Host part of a URL, or the lowered input itself when it is not one.
fn host_of(lowered: &str) -> String {
    url::Url::parse(lowered)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| lowered.to_string())
}

/// Case-insensitive lookup, most trusted tier first. Outlet names match as substrings;
/// domain entries match the source's host on a label boundary.
pub fn tier_for(source: &str) -> Tier {
    let lowered = source.trim().to_lowercase();
    if lowered.is_empty() {
        return Tier::UNKNOWN;
    }
    let host = host_of(&lowered);
    TIERS
        .iter()
        .find(|(_, names)| {
            names.iter().any(|n| {
                if n.contains('.') {
                    host_matches(&host, n)
                } else {
                    lowered.contains(n.as_str())
                }
            })
        })
        .map(|(tier, _)| *tier)
        .unwrap_or(Tier::UNKNOWN)
}

pub fn is_spam(text: &str) -> bool {
    let lowered = text.to_lowercase();
    SPAM_PHRASES.iter().any(|p| lowered.contains(p))
}

pub fn is_blacklisted_url(url: &str) -> bool {
    let host = host_of(&url.trim().to_lowercase());
    BLACKLISTED_DOMAINS.iter().any(|d| host_matches(&host, d))
}
