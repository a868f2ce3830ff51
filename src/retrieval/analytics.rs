use super::SearchMatch;
use serde::Serialize;
use std::collections::BTreeMap;

/// Metadata key used to group matches by category
pub const CATEGORY_KEY: &str = "main_category";

const UNCATEGORIZED: &str = "uncategorized";
const UNKNOWN_VARIATION: &str = "unknown";

/// Match counts per score band
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreDistribution {
    /// >= 0.8
    pub high: usize,
    /// [0.6, 0.8)
    pub upper_mid: usize,
    /// [0.4, 0.6)
    pub lower_mid: usize,
    /// < 0.4
    pub low: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VariationStats {
    pub count: usize,
    pub average_score: f64,
}

/// Summary of a merged result set, for display next to the answer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchAnalytics {
    pub total_results: usize,
    /// Mean rank score, rounded to 4 decimals
    pub average_score: f64,
    pub score_distribution: ScoreDistribution,
    pub category_distribution: BTreeMap<String, usize>,
    /// Keyed by query variation text
    pub query_effectiveness: BTreeMap<String, VariationStats>,
}

impl SearchAnalytics {
    pub fn from_matches(matches: &[SearchMatch]) -> Self {
        if matches.is_empty() {
            return Self::default();
        }

        let mut analytics = Self {
            total_results: matches.len(),
            ..Self::default()
        };
        let mut score_sum = 0.0;
        let mut variation_sums: BTreeMap<String, f64> = BTreeMap::new();

        for m in matches {
            let score = f64::from(m.rank_score());
            score_sum += score;

            let bands = &mut analytics.score_distribution;
            match score {
                s if s >= 0.8 => bands.high += 1,
                s if s >= 0.6 => bands.upper_mid += 1,
                s if s >= 0.4 => bands.lower_mid += 1,
                _ => bands.low += 1,
            }

            let category = m
                .metadata
                .get(CATEGORY_KEY)
                .and_then(|v| v.as_str())
                .unwrap_or(UNCATEGORIZED);
            *analytics
                .category_distribution
                .entry(category.to_string())
                .or_default() += 1;

            let variation = m.query_variation.as_deref().unwrap_or(UNKNOWN_VARIATION);
            analytics
                .query_effectiveness
                .entry(variation.to_string())
                .or_default()
                .count += 1;
            *variation_sums.entry(variation.to_string()).or_default() += score;
        }

        for (variation, stats) in analytics.query_effectiveness.iter_mut() {
            stats.average_score = variation_sums[variation] / stats.count as f64;
        }

        analytics.average_score = round4(score_sum / matches.len() as f64);
        analytics
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
