// src/render.rs
use itertools::Itertools;

use crate::models::FinalVerdict;

pub fn render_verdict_markdown(query: &str, v: &FinalVerdict) -> String {
    let mut md = String::new();
    md.push_str(&format!("# {}\n\n", query.trim()));

    md.push_str(&format!("## Verdict: {} ({}% confidence)\n", v.label, v.confidence_score));
    if !v.verdict_text.trim().is_empty() {
        md.push_str(&format!("{}\n", v.verdict_text.trim()));
    }
    md.push('\n');

    let q = &v.data_quality;
    md.push_str("## Data Quality\n");
    md.push_str(&format!(
        "- {} sources across {} platforms ({})\n",
        q.source_count,
        q.platforms_used,
        q.platform_breakdown
            .iter()
            .map(|(p, n)| format!("{p}: {n}"))
            .join(", ")
    ));
    md.push_str(&format!(
        "- Average quality {:.0}/100, average relevance {:.0}/100\n",
        q.avg_quality_score, q.avg_relevance_score
    ));
    md.push_str(&format!("- Data-quality boost +{} of 30\n\n", q.confidence_boost));

    if !v.key_factors.is_empty() {
        md.push_str("## Key Factors\n");
        for f in &v.key_factors {
            md.push_str(&format!("- {}\n", f));
        }
        md.push('\n');
    }

    if !v.caveats.is_empty() {
        md.push_str("## Caveats\n");
        for c in &v.caveats {
            md.push_str(&format!("- {}\n", c));
        }
        md.push('\n');
    }

    if !v.evidence.is_empty() {
        md.push_str("## Evidence\n");
        for (i, e) in v.evidence.iter().enumerate() {
            let title = match e.raw.url.as_deref() {
                Some(url) => format!("[{}]({})", e.raw.title.trim(), url),
                None => e.raw.title.trim().to_string(),
            };
            let sentiment = e.raw.sentiment.map(|s| format!(", {s}")).unwrap_or_default();
            md.push_str(&format!(
                "{}. {} ({}, {}, quality {}{})\n",
                i + 1,
                title,
                e.raw.reputation_key(),
                e.reputation_badge,
                e.quality_score,
                sentiment
            ));
        }
    }

    md
}
