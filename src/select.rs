use std::collections::BTreeMap;
use tracing::debug;

use crate::config::{Band, BaselineBands};
use crate::models::{DataQualityMetrics, EvidenceSet, ScoredEvidence};

/// Stable sort by descending quality, then truncate. Ties keep collection order.
pub fn select_evidence(mut scored: Vec<ScoredEvidence>, cap: usize) -> EvidenceSet {
    let before = scored.len();
    scored.sort_by(|a, b| b.quality_score.cmp(&a.quality_score));
    scored.truncate(cap);
    debug!("Evidence selected - candidates={}, kept={}, cap={}", before, scored.len(), cap);
    EvidenceSet::from_ranked(scored)
}

fn band_points(value: f32, bands: &[Band]) -> u8 {
    bands
        .iter()
        .find(|b| value >= b.at_least)
        .map(|b| b.points.min(BaselineBands::COMPONENT_MAX))
        .unwrap_or(0)
}

/// Objective 0–30 contribution from set size, platform diversity and mean quality.
pub fn confidence_boost(
    source_count: usize,
    platforms_used: usize,
    avg_quality: f32,
    bands: &BaselineBands,
) -> u8 {
    if source_count == 0 {
        return 0;
    }
    let quantity = band_points(source_count as f32, &bands.quantity);
    let diversity = band_points(platforms_used as f32, &bands.diversity);
    let quality = band_points(avg_quality, &bands.quality);
    quantity + diversity + quality
}

pub fn data_quality(set: &EvidenceSet, bands: &BaselineBands) -> DataQualityMetrics {
    let items = set.items();
    let source_count = items.len();

    let mut platform_breakdown: BTreeMap<String, usize> = BTreeMap::new();
    for item in items {
        *platform_breakdown.entry(item.raw.provider.clone()).or_default() += 1;
    }
    let platforms_used = platform_breakdown.len();

    let (avg_quality_score, avg_relevance_score) = if source_count == 0 {
        (0.0, 0.0)
    } else {
        let n = source_count as f32;
        (
            items.iter().map(|i| i.quality_score as f32).sum::<f32>() / n,
            items.iter().map(|i| i.relevance_score).sum::<f32>() / n,
        )
    };

    let confidence_boost = confidence_boost(source_count, platforms_used, avg_quality_score, bands);
    debug!(
        "Data quality - sources={}, platforms={}, avg_quality={:.1}, boost={}",
        source_count, platforms_used, avg_quality_score, confidence_boost
    );

    DataQualityMetrics {
        source_count,
        platforms_used,
        platform_breakdown,
        avg_quality_score,
        avg_relevance_score,
        confidence_boost,
    }
}
