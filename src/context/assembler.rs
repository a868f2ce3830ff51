use super::{DEFAULT_CONTEXT_TOKENS, DEFAULT_TOP_K, PASSAGE_SEPARATOR, render_passage};
use crate::retrieval::{DEFAULT_SIMILARITY_THRESHOLD, SearchMatch};
use crate::tokenizer::{CachedCounter, TokenCounter};
use crate::window::{DEFAULT_HISTORY_TOKENS, Message, optimize};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Window shared by history, passages, system prompt and query
    pub max_tokens: usize,
    /// Budget for rendered passages
    pub context_tokens: usize,
    pub top_k: usize,
    pub similarity_threshold: f32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_HISTORY_TOKENS,
            context_tokens: DEFAULT_CONTEXT_TOKENS,
            top_k: DEFAULT_TOP_K,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

/// Tokens spent per prompt section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub query: usize,
    pub system_prompt: usize,
    pub history: usize,
    pub context: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledContext {
    /// Rendered passages joined for the prompt
    pub context: String,
    /// Ids of the matches whose passages made it in
    pub sources: Vec<String>,
    pub history: Vec<Message>,
    /// True when no match cleared the threshold and the top matches were
    /// used anyway
    pub fallback: bool,
    pub usage: TokenUsage,
}

pub struct ContextAssembler<'a> {
    config: ContextConfig,
    counter: &'a dyn TokenCounter,
}

impl<'a> ContextAssembler<'a> {
    pub fn new(counter: &'a dyn TokenCounter) -> Self {
        Self::with_config(counter, ContextConfig::default())
    }

    pub fn with_config(counter: &'a dyn TokenCounter, config: ContextConfig) -> Self {
        Self { config, counter }
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    pub fn context_tokens(mut self, context_tokens: usize) -> Self {
        self.config.context_tokens = context_tokens;
        self
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.config.top_k = top_k;
        self
    }

    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Pick up to `top_k` matches at or above the threshold, best first
    ///
    /// Falls back to the best `top_k` regardless of score when none
    /// qualify; the flag reports whether that happened.
    pub fn select<'m>(&self, matches: &'m [SearchMatch]) -> (Vec<&'m SearchMatch>, bool) {
        let mut ranked: Vec<&SearchMatch> = matches.iter().collect();
        ranked.sort_by(|a, b| b.rank_score().total_cmp(&a.rank_score()));

        let passing: Vec<&SearchMatch> = ranked
            .iter()
            .copied()
            .filter(|m| m.rank_score() >= self.config.similarity_threshold)
            .take(self.config.top_k)
            .collect();

        if passing.is_empty() && !ranked.is_empty() {
            tracing::debug!(
                threshold = self.config.similarity_threshold,
                candidates = ranked.len(),
                "no match cleared threshold, using top matches"
            );
            ranked.truncate(self.config.top_k);
            return (ranked, true);
        }

        (passing, false)
    }

    /// Build the prompt pieces for one question
    pub fn assemble(
        &self,
        system_prompt: &str,
        query: &str,
        history: &[Message],
        matches: &[SearchMatch],
    ) -> AssembledContext {
        let counter = CachedCounter::new(self.counter);
        let (selected, fallback) = self.select(matches);

        let mut passages = Vec::new();
        let mut sources = Vec::new();
        let mut used = 0usize;

        for m in selected {
            let passage = render_passage(m);
            if passage.is_empty() {
                continue;
            }
            let cost = counter.count(&passage);
            if used + cost > self.config.context_tokens {
                tracing::debug!(id = %m.id, cost, used, "passage does not fit context budget");
                continue;
            }
            used += cost;
            passages.push(passage);
            sources.push(m.id.clone());
        }

        let context = passages.join(PASSAGE_SEPARATOR);

        let mut usage = TokenUsage {
            query: counter.count(query),
            system_prompt: counter.count(system_prompt),
            context: counter.count(&context),
            ..TokenUsage::default()
        };

        let reserved = usage.system_prompt + usage.context + usage.query;
        let history = optimize(history, self.config.max_tokens, reserved, &counter);

        usage.history = history.iter().map(|m| counter.count(&m.content)).sum();
        usage.total = usage.query + usage.system_prompt + usage.history + usage.context;

        if usage.total > self.config.max_tokens {
            tracing::warn!(
                total = usage.total,
                max_tokens = self.config.max_tokens,
                "assembled prompt exceeds window"
            );
        }

        tracing::debug!(
            passages = sources.len(),
            history = history.len(),
            total_tokens = usage.total,
            "assembled context"
        );

        AssembledContext {
            context,
            sources,
            history,
            fallback,
            usage,
        }
    }
}
