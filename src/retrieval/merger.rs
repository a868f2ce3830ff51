use super::{
    DEFAULT_MAX_VARIATIONS, DEFAULT_PENALTY_PER_VARIATION, DEFAULT_SIMILARITY_THRESHOLD,
    SearchMatch,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One query to send to the vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryVariation {
    /// 0 for the user's own query
    pub index: usize,
    pub query: String,
    /// Minimum raw score to request for this query
    pub threshold: f32,
}

/// Matches returned for one query variation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationRun {
    pub query: String,
    #[serde(default)]
    pub matches: Vec<SearchMatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Minimum adjusted score kept after merging
    pub similarity_threshold: f32,
    /// Subtracted once per variation index
    pub penalty_per_variation: f32,
    /// Query variations to search, original included
    pub max_variations: usize,
    /// Lower bound for the per-variation search threshold
    pub variation_threshold_floor: f32,
    /// How much looser the search threshold is for reformulated queries
    pub variation_threshold_step: f32,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            penalty_per_variation: DEFAULT_PENALTY_PER_VARIATION,
            max_variations: DEFAULT_MAX_VARIATIONS,
            variation_threshold_floor: 0.2,
            variation_threshold_step: 0.1,
        }
    }
}

impl MergeConfig {
    /// Store-side threshold for the query at `index`
    ///
    /// The user's own query uses the base threshold; reformulations are
    /// searched a step looser, never below the floor.
    pub fn variation_threshold(&self, index: usize) -> f32 {
        if index == 0 {
            self.similarity_threshold
        } else {
            (self.similarity_threshold - self.variation_threshold_step)
                .max(self.variation_threshold_floor)
        }
    }

    /// Deduplicate and cap the query variations, assigning each its index
    /// and store-side threshold
    pub fn plan<I, S>(&self, variations: I) -> Vec<QueryVariation>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        unique_variations(variations, self.max_variations)
            .into_iter()
            .enumerate()
            .map(|(index, query)| QueryVariation {
                index,
                threshold: self.variation_threshold(index),
                query,
            })
            .collect()
    }

    /// Merge the search runs of several query variations
    ///
    /// Runs are planned in input order, so the first run must be the
    /// user's own query. Duplicate and excess runs are dropped. Each
    /// run's matches below its variation threshold are discarded, and the
    /// rest are tagged with the variation before merging.
    pub fn merge_runs(&self, runs: Vec<VariationRun>) -> Vec<SearchMatch> {
        let plan = self.plan(runs.iter().map(|run| run.query.as_str()));
        let mut runs: HashMap<String, Vec<SearchMatch>> = runs
            .into_iter()
            .rev()
            .map(|run| (run.query, run.matches))
            .collect();

        let mut tagged = Vec::new();
        for variation in &plan {
            let Some(matches) = runs.remove(&variation.query) else {
                continue;
            };
            tagged.extend(
                matches
                    .into_iter()
                    .filter(|m| m.score >= variation.threshold)
                    .map(|m| SearchMatch {
                        query_index: variation.index,
                        query_variation: Some(variation.query.clone()),
                        ..m
                    }),
            );
        }

        tracing::debug!(
            variations = plan.len(),
            dropped_runs = runs.len(),
            candidates = tagged.len(),
            "tagged variation runs"
        );

        self.merge(tagged)
    }

    pub fn merge(&self, all_matches: impl IntoIterator<Item = SearchMatch>) -> Vec<SearchMatch> {
        merge(
            all_matches,
            self.similarity_threshold,
            self.penalty_per_variation,
        )
    }
}

/// Deduplicate, penalize, rank and filter matches from several queries
///
/// For a repeated id the occurrence with the strictly higher raw score
/// wins, before any penalty. The output is sorted by adjusted score,
/// descending; equal scores keep first-encounter order. Merging the
/// output again yields the same list.
pub fn merge(
    all_matches: impl IntoIterator<Item = SearchMatch>,
    similarity_threshold: f32,
    penalty_per_variation: f32,
) -> Vec<SearchMatch> {
    let mut unique: Vec<SearchMatch> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut seen = 0usize;

    for m in all_matches {
        seen += 1;
        match slots.get(&m.id) {
            Some(&slot) => {
                if m.score > unique[slot].score {
                    unique[slot] = m;
                }
            }
            None => {
                slots.insert(m.id.clone(), unique.len());
                unique.push(m);
            }
        }
    }

    for m in &mut unique {
        m.adjusted_score = Some(m.penalized(penalty_per_variation));
    }

    unique.sort_by(|a, b| b.rank_score().total_cmp(&a.rank_score()));
    let deduped = unique.len();
    unique.retain(|m| m.rank_score() >= similarity_threshold);

    tracing::debug!(
        seen,
        deduped,
        kept = unique.len(),
        similarity_threshold,
        "merged search results"
    );

    unique
}

/// Order-preserving dedup of query variations, capped at `max`
///
/// Blank variations are dropped. The first entry should be the user's
/// original query so it keeps index 0.
pub fn unique_variations<I, S>(variations: I, max: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    variations
        .into_iter()
        .map(Into::into)
        .filter(|v| !v.trim().is_empty())
        .filter(|v| seen.insert(v.clone()))
        .take(max)
        .collect()
}
