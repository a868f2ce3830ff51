use super::{DEFAULT_HISTORY_TOKENS, Message};
use crate::tokenizer::{CachedCounter, TokenCounter};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Total context window given to history plus overhead
    pub max_tokens: usize,
    /// Tokens already spoken for by the system prompt and retrieved context
    pub reserved_overhead: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_HISTORY_TOKENS,
            reserved_overhead: 0,
        }
    }
}

impl WindowConfig {
    pub fn budget(&self) -> usize {
        self.max_tokens.saturating_sub(self.reserved_overhead)
    }

    pub fn optimize(&self, messages: &[Message], counter: &dyn TokenCounter) -> Vec<Message> {
        optimize(messages, self.max_tokens, self.reserved_overhead, counter)
    }
}

/// Select the messages to send within `max_tokens - reserved_overhead`
///
/// System messages and the most recent non-system message are always
/// kept. The remaining budget goes to the cheapest other messages first,
/// which keeps the most turns rather than the most text.
///
/// When pruning happens, admitted older turns are placed at the front in
/// chronological order, followed by the system messages and the latest
/// turn in their original order.
///
/// Precondition: the reserve leaves room for all system messages and the
/// latest turn. If it doesn't, those are still returned and the result
/// is over budget.
pub fn optimize(
    messages: &[Message],
    max_tokens: usize,
    reserved_overhead: usize,
    counter: &dyn TokenCounter,
) -> Vec<Message> {
    let counter = CachedCounter::new(counter);
    let budget = max_tokens.saturating_sub(reserved_overhead);

    let costs: Vec<usize> = messages.iter().map(|m| counter.count(&m.content)).collect();
    let total: usize = costs.iter().sum();

    if total <= budget {
        return messages.to_vec();
    }

    let (pinned, candidates): (Vec<usize>, Vec<usize>) =
        (0..messages.len()).partition(|&i| messages[i].is_pinned());

    let pinned_cost: usize = pinned.iter().map(|&i| costs[i]).sum();
    let mut remaining = budget as i64 - pinned_cost as i64;
    let mut core = pinned;
    let mut admitted = Vec::new();

    if let Some((&latest, older)) = candidates.split_last() {
        core.push(latest);
        remaining -= costs[latest] as i64;

        if remaining < 0 {
            tracing::warn!(
                budget,
                over_by = -remaining,
                "system messages and latest turn exceed history budget"
            );
        }

        // Cheapest first; on equal cost the newer message wins
        let mut older = older.to_vec();
        older.sort_by_key(|&i| (costs[i], Reverse(i)));

        for i in older {
            let cost = costs[i] as i64;
            if cost > remaining {
                break;
            }
            admitted.push(i);
            remaining -= cost;
        }
    }

    core.sort_unstable();
    admitted.sort_unstable();

    let kept: Vec<Message> = admitted
        .iter()
        .chain(&core)
        .map(|&i| messages[i].clone())
        .collect();

    tracing::debug!(
        before = messages.len(),
        after = kept.len(),
        total_tokens = total,
        budget,
        "pruned conversation history"
    );

    kept
}
